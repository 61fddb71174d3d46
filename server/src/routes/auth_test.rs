use axum::http::HeaderValue;

use super::*;

fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
}

fn status_of(r: Result<&str, ApiError>) -> StatusCode {
    r.map(|_| StatusCode::OK).unwrap_or_else(|e| e.status())
}

#[test]
fn missing_header_is_401() {
    let err = bearer_token(&HeaderMap::new()).unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.to_string(), MISSING_TOKEN);
}

#[test]
fn wrong_scheme_or_empty_is_401() {
    assert_eq!(status_of(bearer_token(&headers("Basic dXNlcjpwYXNz"))), StatusCode::UNAUTHORIZED);
    assert_eq!(status_of(bearer_token(&headers("Bearer   "))), StatusCode::UNAUTHORIZED);
}

#[test]
fn malformed_token_is_422() {
    let err = bearer_token(&headers("Bearer not-a-session-token")).unwrap_err();
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.to_string(), "Invalid token");
}

#[test]
fn well_formed_token_passes() {
    let token = session::generate_token();
    let h = headers(&format!("Bearer {token}"));
    assert_eq!(bearer_token(&h).unwrap(), token);
}
