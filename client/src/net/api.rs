//! Typed wrappers for the authenticated REST endpoints.
//!
//! Every call goes through the shared [`HttpClient`], so a rejected token
//! clears the session the same way no matter which endpoint saw it.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use contract::{
    Ack, AdminCheck, BulkCatalogRequest, BulkCreated, CatalogExerciseInput, CatalogFilter, CatalogPage,
    ChatHistoryEntry, Created, ExerciseEntry, ExerciseSummary, Health, NewExercise, NewNutritionPlan,
    NutritionPlanEntry, UpdateUserRequest, UpdateUserResponse, UserDetail, UserProfile, paths,
};
use serde_json::Value;

use super::http::HttpClient;
use crate::error::ClientError;

#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /api/user` with the stored profile.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn current_user(&self) -> Result<UserDetail, ClientError> {
        self.http.get(paths::USER).await
    }

    /// `PUT /api/user`.
    ///
    /// # Errors
    ///
    /// Returns the request error; duplicates and bad emails come back as 400.
    pub async fn update_user(&self, update: &UpdateUserRequest) -> Result<UpdateUserResponse, ClientError> {
        self.http.put(paths::USER, update).await
    }

    /// `GET /api/user/profile`. An account without a profile yields an empty one.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.http.get(paths::USER_PROFILE).await
    }

    /// `PUT /api/user/profile`. Only the fields set in `profile` are written;
    /// the merged profile is returned.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile, ClientError> {
        self.http.put(paths::USER_PROFILE, profile).await
    }

    /// `GET /api/exercises`, newest first.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn exercises(&self) -> Result<Vec<ExerciseEntry>, ClientError> {
        self.http.get(paths::EXERCISES).await
    }

    /// `POST /api/exercises`.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn add_exercise(&self, entry: &NewExercise) -> Result<Created, ClientError> {
        self.http.post(paths::EXERCISES, entry).await
    }

    /// `GET /api/chat/history`, newest first.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn chat_history(&self) -> Result<Vec<ChatHistoryEntry>, ClientError> {
        self.http.get(paths::CHAT_HISTORY).await
    }

    /// `GET /api/health`.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn health(&self) -> Result<Health, ClientError> {
        self.http.get(paths::HEALTH).await
    }

    // =========================================================================
    // NUTRITION
    // =========================================================================

    /// `GET /api/nutrition/plans?type=<plan_type>`, in day order.
    ///
    /// # Errors
    ///
    /// Returns the request error; an unknown plan type comes back as 400.
    pub async fn nutrition_plans(&self, plan_type: &str) -> Result<Vec<NutritionPlanEntry>, ClientError> {
        let query = vec![("type".to_owned(), plan_type.to_owned())];
        self.http.get_with_query(paths::NUTRITION_PLANS, query).await
    }

    /// `POST /api/nutrition/plans`.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn add_nutrition_plan(&self, plan: &NewNutritionPlan) -> Result<Created, ClientError> {
        self.http.post(paths::NUTRITION_PLANS, plan).await
    }

    // =========================================================================
    // ADMIN CATALOG
    // =========================================================================

    /// `GET /api/admin/check-admin`.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn is_admin(&self) -> Result<bool, ClientError> {
        let check: AdminCheck = self.http.get(paths::ADMIN_CHECK).await?;
        Ok(check.is_admin)
    }

    /// `GET /api/admin/exercises`. A non-admin gets a 403, which leaves the
    /// session alone.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn catalog(&self, filter: &CatalogFilter) -> Result<CatalogPage, ClientError> {
        self.http.get_with_query(paths::ADMIN_EXERCISES, filter_query(filter)).await
    }

    /// # Errors
    ///
    /// Returns the request error; an unknown id comes back as 404.
    pub async fn catalog_exercise(&self, id: i64) -> Result<ExerciseSummary, ClientError> {
        self.http.get(&paths::admin_exercise(id)).await
    }

    /// # Errors
    ///
    /// Returns the request error; a missing or invalid field comes back as 400.
    pub async fn create_catalog_exercise(&self, input: &CatalogExerciseInput) -> Result<ExerciseSummary, ClientError> {
        self.http.post(paths::ADMIN_EXERCISES, input).await
    }

    /// # Errors
    ///
    /// Returns the request error.
    pub async fn update_catalog_exercise(
        &self,
        id: i64,
        patch: &CatalogExerciseInput,
    ) -> Result<ExerciseSummary, ClientError> {
        self.http.put(&paths::admin_exercise(id), patch).await
    }

    /// # Errors
    ///
    /// Returns the request error.
    pub async fn delete_catalog_exercise(&self, id: i64) -> Result<Ack, ClientError> {
        self.http.delete(&paths::admin_exercise(id)).await
    }

    /// `POST /api/admin/exercises/bulk`. Items the server rejects are listed
    /// in `errors`; the rest are created.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    pub async fn bulk_create_catalog(&self, exercises: Vec<Value>) -> Result<BulkCreated, ClientError> {
        self.http.post(paths::ADMIN_EXERCISES_BULK, &BulkCatalogRequest { exercises }).await
    }
}

fn filter_query(filter: &CatalogFilter) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(category) = &filter.category {
        query.push(("category".to_owned(), category.clone()));
    }
    if let Some(level) = &filter.level {
        query.push(("level".to_owned(), level.clone()));
    }
    if let Some(page) = filter.page {
        query.push(("page".to_owned(), page.to_string()));
    }
    if let Some(per_page) = filter.per_page {
        query.push(("per_page".to_owned(), per_page.to_string()));
    }
    query
}
