//! Request extraction.
//!
//! Axum's `Json` rejects a body it cannot decode with 422, the status the
//! client reserves for a rejected token. [`ApiJson`] reports every body
//! problem as a 400 `ApiError` instead, so a bad payload never ends a
//! session. [`ApiQuery`] and [`ApiPath`] do the same for the query string
//! and path parameters, which axum would otherwise answer in plain text.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::response::Json;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// JSON request body whose rejection renders as `ApiError::BadRequest`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "body: rejected");
                Err(ApiError::bad_request(rejection.body_text()))
            }
        }
    }
}

/// Query string whose rejection renders as `ApiError::BadRequest`.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "query: rejected");
                Err(ApiError::bad_request(rejection.body_text()))
            }
        }
    }
}

/// Path parameters whose rejection renders as `ApiError::BadRequest`.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "path: rejected");
                Err(ApiError::bad_request(rejection.body_text()))
            }
        }
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
