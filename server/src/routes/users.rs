//! Account and fitness profile routes.

use axum::extract::State;
use axum::response::Json;
use contract::{UpdateUserRequest, UpdateUserResponse, UserDetail, UserProfile};
use serde_json::{Map, Value};

use super::auth::AuthUser;
use super::extract::ApiJson;
use crate::error::ApiError;
use crate::services::{accounts, profile};
use crate::state::AppState;

/// `GET /api/user`: the account plus its profile, if one is stored.
pub async fn get_user(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserDetail>, ApiError> {
    let stored = profile::load(&state.pool, auth.user.id).await?;
    Ok(Json(UserDetail { user: auth.user.to_user(), profile: stored }))
}

/// `PUT /api/user`
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>, ApiError> {
    let user = accounts::update_account(&state.pool, &auth.user, req).await?;
    Ok(Json(UpdateUserResponse { message: "User updated successfully".into(), user }))
}

/// `GET /api/user/profile`: empty object when none is stored.
pub async fn get_profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(profile::load(&state.pool, auth.user.id).await?.unwrap_or_default()))
}

/// `PUT /api/user/profile`: merge the supplied fields. Numbers and flags
/// sent as strings are coerced; values that fit no field are ignored.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(fields): ApiJson<Map<String, Value>>,
) -> Result<Json<UserProfile>, ApiError> {
    let patch = profile_patch(&fields)?;
    Ok(Json(profile::upsert(&state.pool, auth.user.id, &patch).await?))
}

pub(crate) fn profile_patch(fields: &Map<String, Value>) -> Result<UserProfile, ApiError> {
    let patch = profile::patch_from_body(fields);
    if patch.workout_days_per_week.is_some_and(|d| !(1..=7).contains(&d)) {
        return Err(ApiError::bad_request("workout_days_per_week must be between 1 and 7"));
    }
    Ok(patch)
}
