//! Auth routes: register, login, logout and the bearer extractor.

use axum::extract::{FromRef, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use contract::{AuthResponse, LoginRequest, RegisterRequest};
use tracing::debug;

use super::extract::ApiJson;
use crate::error::ApiError;
use crate::services::{accounts, session};
use crate::state::AppState;

pub const MISSING_TOKEN: &str = "Authorization token is missing";
pub const EXPIRED_TOKEN: &str = "Token has expired";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// # Errors
///
/// 401 when the header or the bearer scheme is missing, 422 when the token
/// is not a session token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    let Some(token) = raw.strip_prefix("Bearer ").map(str::trim) else {
        return Err(ApiError::unauthorized(MISSING_TOKEN));
    };
    if token.is_empty() {
        return Err(ApiError::unauthorized(MISSING_TOKEN));
    }
    if !session::is_well_formed(token) {
        return Err(ApiError::InvalidToken);
    }
    Ok(token)
}

/// Authenticated user resolved from the bearer token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let app_state = AppState::from_ref(state);
        let Some(user) = session::validate_session(&app_state.pool, token).await? else {
            debug!("auth: unknown or expired session");
            return Err(ApiError::unauthorized(EXPIRED_TOKEN));
        };
        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let resp = accounts::register(&state.pool, req, state.config.session_ttl).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// `POST /api/login`
pub async fn login(State(state): State<AppState>, ApiJson(req): ApiJson<LoginRequest>) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(accounts::login(&state.pool, req, state.config.session_ttl).await?))
}

/// `POST /api/logout`: revoke the presented session.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<impl IntoResponse, ApiError> {
    session::delete_session(&state.pool, &auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
