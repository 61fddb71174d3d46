//! Exercise history routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use contract::{Created, ExerciseEntry, NewExercise};

use super::auth::AuthUser;
use super::extract::ApiJson;
use crate::error::ApiError;
use crate::services::exercises;
use crate::state::AppState;

/// `GET /api/exercises`
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<ExerciseEntry>>, ApiError> {
    Ok(Json(exercises::list_history(&state.pool, auth.user.id).await?))
}

/// `POST /api/exercises`
pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(entry): ApiJson<NewExercise>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    if entry.exercise_name.trim().is_empty() {
        return Err(ApiError::bad_request("Exercise name is required"));
    }
    let id = exercises::add_history(&state.pool, auth.user.id, &entry).await?;
    Ok((StatusCode::CREATED, Json(Created { id, message: "Exercise added successfully".into() })))
}
