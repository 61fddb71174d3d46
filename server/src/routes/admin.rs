//! Admin routes: the admin check and exercise catalog maintenance.
//!
//! Every handler resolves the bearer session first, then refuses non-admin
//! accounts with 403 so the client keeps its session.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use contract::{Ack, AdminCheck, BulkCatalogRequest, BulkCreated, CatalogExerciseInput, CatalogFilter, CatalogPage, ExerciseSummary};
use tracing::warn;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::ApiError;
use crate::services::catalog;
use crate::state::AppState;

pub const NOT_ADMIN: &str = "Unauthorized";

/// # Errors
///
/// 403 unless the session belongs to an admin.
pub fn require_admin(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.user.is_admin() {
        Ok(())
    } else {
        warn!(user_id = auth.user.id, "admin: refused");
        Err(ApiError::forbidden(NOT_ADMIN))
    }
}

/// `GET /api/admin/check-admin`
pub async fn check_admin(auth: AuthUser) -> Json<AdminCheck> {
    Json(AdminCheck { is_admin: auth.user.is_admin() })
}

/// `GET /api/admin/exercises?category=&level=&page=&per_page=`
pub async fn list_exercises(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(filter): ApiQuery<CatalogFilter>,
) -> Result<Json<CatalogPage>, ApiError> {
    require_admin(&auth)?;
    Ok(Json(catalog::list(&state.pool, &filter, &auth.user.language).await?))
}

/// `GET /api/admin/exercises/{id}`
pub async fn get_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ExerciseSummary>, ApiError> {
    require_admin(&auth)?;
    Ok(Json(catalog::get(&state.pool, id, &auth.user.language).await?))
}

/// `POST /api/admin/exercises`
pub async fn create_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<CatalogExerciseInput>,
) -> Result<(StatusCode, Json<ExerciseSummary>), ApiError> {
    require_admin(&auth)?;
    let created = catalog::create(&state.pool, &input, &auth.user.language).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/admin/exercises/{id}`
pub async fn update_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CatalogExerciseInput>,
) -> Result<Json<ExerciseSummary>, ApiError> {
    require_admin(&auth)?;
    Ok(Json(catalog::update(&state.pool, id, &patch, &auth.user.language).await?))
}

/// `DELETE /api/admin/exercises/{id}`
pub async fn delete_exercise(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Ack>, ApiError> {
    require_admin(&auth)?;
    catalog::delete(&state.pool, id).await?;
    Ok(Json(Ack { message: "Exercise deleted successfully".into() }))
}

/// `POST /api/admin/exercises/bulk`
pub async fn bulk_create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<BulkCatalogRequest>,
) -> Result<(StatusCode, Json<BulkCreated>), ApiError> {
    require_admin(&auth)?;
    let created = catalog::bulk_create(&state.pool, &req.exercises).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
