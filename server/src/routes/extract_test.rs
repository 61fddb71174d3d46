use axum::body::Body;
use axum::http::{StatusCode, header};
use contract::{CatalogFilter, LoginRequest};
use serde_json::{Map, Value};

use super::*;
use crate::error::ErrorCode;

fn json_request(body: &str) -> Request {
    Request::builder()
        .method("PUT")
        .uri("/api/user/profile")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn decodes_a_valid_body() {
    let ApiJson(fields) = ApiJson::<Map<String, Value>>::from_request(json_request(r#"{"age":"25"}"#), &())
        .await
        .unwrap();
    assert_eq!(fields["age"], "25");
}

#[tokio::test]
async fn mistyped_field_is_400_not_422() {
    let Err(err) = ApiJson::<LoginRequest>::from_request(json_request(r#"{"username":5}"#), &()).await else {
        panic!("expected a rejection");
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.error_code(), "E_BAD_REQUEST");
}

#[tokio::test]
async fn syntax_error_is_400() {
    let Err(err) = ApiJson::<Map<String, Value>>::from_request(json_request("{not json"), &()).await else {
        panic!("expected a rejection");
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_content_type_is_400() {
    let req = Request::builder().method("POST").uri("/api/chat").body(Body::from("{}")).unwrap();
    let Err(err) = ApiJson::<Map<String, Value>>::from_request(req, &()).await else {
        panic!("expected a rejection");
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_string_decodes_and_mistyped_page_is_400() {
    let req = Request::builder().uri("/api/admin/exercises?level=beginner&page=2").body(Body::empty()).unwrap();
    let (mut parts, _) = req.into_parts();
    let ApiQuery(filter) = ApiQuery::<CatalogFilter>::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(filter.level.as_deref(), Some("beginner"));
    assert_eq!(filter.page, Some(2));

    let req = Request::builder().uri("/api/admin/exercises?page=two").body(Body::empty()).unwrap();
    let (mut parts, _) = req.into_parts();
    let Err(err) = ApiQuery::<CatalogFilter>::from_request_parts(&mut parts, &()).await else {
        panic!("expected a rejection");
    };
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_numeric_path_id_is_400_json() {
    use axum::Router;
    use axum::routing::get;
    use tower::ServiceExt;

    let router = Router::new().route("/items/{id}", get(|ApiPath(id): ApiPath<i64>| async move { id.to_string() }));
    let resp = router
        .clone()
        .oneshot(Request::builder().uri("/items/41").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router.oneshot(Request::builder().uri("/items/abc").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "E_BAD_REQUEST");
}
