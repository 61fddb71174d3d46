use axum::body::to_bytes;
use serde_json::Value;

use super::*;

async fn render(err: ApiError) -> (StatusCode, Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn invalid_token_is_422_with_message() {
    let (status, body) = render(ApiError::InvalidToken).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Invalid token");
    assert_eq!(body["code"], "E_INVALID_TOKEN");
}

#[tokio::test]
async fn unauthorized_carries_message() {
    let (status, body) = render(ApiError::unauthorized("Token has expired")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has expired");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn database_error_hides_detail() {
    let (status, body) = render(ApiError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["code"], "E_DATABASE");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn rate_limited_is_429_and_retryable() {
    let err = ApiError::from(RateLimitError::PerUserExceeded { limit: 10, window_secs: 60 });
    let (status, body) = render(err).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "E_RATE_LIMITED");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn forbidden_is_403_and_not_an_auth_failure() {
    let (status, body) = render(ApiError::forbidden("Unauthorized")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["code"], "E_FORBIDDEN");
    assert!(!contract::is_auth_failure(status.as_u16()));
}
