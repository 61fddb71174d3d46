//! Nutrition plan routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use contract::{Created, NewNutritionPlan, NutritionPlanEntry};
use serde::Deserialize;

use super::auth::AuthUser;
use super::extract::{ApiJson, ApiQuery};
use crate::error::ApiError;
use crate::services::nutrition;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PlanQuery {
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
}

/// `GET /api/nutrition/plans?type=2week|4week`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<PlanQuery>,
) -> Result<Json<Vec<NutritionPlanEntry>>, ApiError> {
    let plan_type = nutrition::plan_type_or_default(query.plan_type.as_deref())?;
    Ok(Json(nutrition::list(&state.pool, auth.user.id, plan_type).await?))
}

/// `POST /api/nutrition/plans`
pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(plan): ApiJson<NewNutritionPlan>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = nutrition::add(&state.pool, auth.user.id, &plan).await?;
    Ok((StatusCode::CREATED, Json(Created { id, message: "Nutrition plan added successfully".into() })))
}
