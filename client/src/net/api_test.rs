use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::state::session::Session;
use crate::state::token_store::MemorySlot;

async fn setup(token: &str) -> (MockServer, Session, ApiClient) {
    let server = MockServer::start().await;
    let session = Session::new(&server.uri(), Arc::new(MemorySlot::with_token(token))).expect("session");
    let api = ApiClient::new(session.http().clone());
    (server, session, api)
}

#[tokio::test]
async fn current_user_includes_profile() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "username": "ali", "email": "ali@example.com", "role": "member", "language": "fa",
            "profile": {"weight": 80.5, "training_level": "beginner"}
        })))
        .mount(&server)
        .await;

    let detail = api.current_user().await.expect("user");
    assert_eq!(detail.user.username, "ali");
    let profile = detail.profile.expect("profile");
    assert_eq!(profile.weight, Some(80.5));
    assert_eq!(profile.training_level.as_deref(), Some("beginner"));
}

#[tokio::test]
async fn save_profile_sends_only_set_fields() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("PUT"))
        .and(path("/api/user/profile"))
        .and(body_json(json!({"age": 40, "injuries": ["knee"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"age": 40, "injuries": ["knee"], "height": 170.0})))
        .expect(1)
        .mount(&server)
        .await;

    let update = UserProfile { age: Some(40), injuries: Some(vec!["knee".into()]), ..UserProfile::default() };
    let merged = api.save_profile(&update).await.expect("save");
    assert_eq!(merged.height, Some(170.0));
}

#[tokio::test]
async fn expired_token_on_wrapper_call_clears_session() {
    let (server, session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/exercises"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token has expired"})))
        .mount(&server)
        .await;

    let err = api.exercises().await.unwrap_err();
    assert_eq!(err.user_message(), "Token has expired");
    assert!(session.token().is_none());
}

#[tokio::test]
async fn malformed_token_on_current_user_clears_session() {
    let (server, session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "Invalid token"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = api.current_user().await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.is_auth_failure());
    assert!(session.token().is_none());
    assert!(session.user().is_none());
    assert!(!session.http().header().is_set());
}

#[tokio::test]
async fn bad_request_on_profile_save_keeps_session() {
    let (server, session, api) = setup("tok").await;
    Mock::given(method("PUT"))
        .and(path("/api/user/profile"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "workout_days_per_week must be between 1 and 7"})),
        )
        .mount(&server)
        .await;

    let update = UserProfile { workout_days_per_week: Some(9), ..UserProfile::default() };
    let err = api.save_profile(&update).await.unwrap_err();
    assert_eq!(err.user_message(), "workout_days_per_week must be between 1 and 7");
    assert_eq!(session.token().as_deref(), Some("tok"));
    assert!(session.http().header().is_set());
}

#[tokio::test]
async fn server_error_on_history_keeps_session() {
    let (server, session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(api.chat_history().await.is_err());
    assert_eq!(session.token().as_deref(), Some("tok"));
}

#[tokio::test]
async fn add_exercise_returns_created_id() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("POST"))
        .and(path("/api/exercises"))
        .and(body_json(json!({"exercise_name": "Squat", "duration": 20})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77, "message": "Exercise added"})))
        .mount(&server)
        .await;

    let entry = NewExercise { exercise_name: "Squat".into(), duration: Some(20), ..NewExercise::default() };
    assert_eq!(api.add_exercise(&entry).await.expect("created").id, 77);
}

#[tokio::test]
async fn nutrition_plans_send_the_plan_type() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/nutrition/plans"))
        .and(query_param("type", "4week"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "day": 1, "meal_type": "breakfast", "food_item": "Oats", "calories": 350,
             "protein": 12.5, "carbs": 60.0, "fats": 6.0, "notes": null},
            {"id": 2, "day": 2, "meal_type": null, "food_item": "Rice", "calories": null,
             "protein": null, "carbs": null, "fats": null, "notes": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let plans = api.nutrition_plans("4week").await.expect("plans");
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].meal_type.as_deref(), Some("breakfast"));
    assert_eq!(plans[0].protein, Some(12.5));
    assert_eq!(plans[1].calories, None);
}

#[tokio::test]
async fn add_nutrition_plan_posts_only_set_fields() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("POST"))
        .and(path("/api/nutrition/plans"))
        .and(body_json(json!({"plan_type": "2week", "day": 3, "food_item": "Eggs", "protein": 13.0})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 9, "message": "Nutrition plan added successfully"})),
        )
        .mount(&server)
        .await;

    let plan = NewNutritionPlan {
        plan_type: "2week".into(),
        day: Some(3),
        food_item: "Eggs".into(),
        protein: Some(13.0),
        ..NewNutritionPlan::default()
    };
    assert_eq!(api.add_nutrition_plan(&plan).await.expect("created").id, 9);
}

#[tokio::test]
async fn catalog_sends_filters_as_query() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/admin/exercises"))
        .and(query_param("level", "beginner"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exercises": [{"id": 5, "name": "Squat", "level": "beginner", "gender_suitability": "both"}],
            "total": 51, "pages": 2, "current_page": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = CatalogFilter { level: Some("beginner".into()), page: Some(2), ..CatalogFilter::default() };
    let page = api.catalog(&filter).await.expect("page");
    assert_eq!(page.total, 51);
    assert_eq!(page.exercises[0].gender_suitability, "both");
}

#[tokio::test]
async fn forbidden_catalog_call_keeps_session() {
    let (server, session, api) = setup("tok").await;
    Mock::given(method("DELETE"))
        .and(path("/api/admin/exercises/4"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Unauthorized", "code": "E_FORBIDDEN"})))
        .mount(&server)
        .await;

    let err = api.delete_catalog_exercise(4).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(!err.is_auth_failure());
    assert_eq!(session.token().as_deref(), Some("tok"));
    assert!(session.http().header().is_set());
}

#[tokio::test]
async fn admin_check_and_bulk_create() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("GET"))
        .and(path("/api/admin/check-admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"is_admin": true})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/exercises/bulk"))
        .and(body_json(json!({"exercises": [{"name_fa": "x"}]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Created 0 exercises", "created": [],
            "errors": ["Exercise 1: Missing required field: category"]
        })))
        .mount(&server)
        .await;

    assert!(api.is_admin().await.expect("check"));
    let result = api.bulk_create_catalog(vec![json!({"name_fa": "x"})]).await.expect("bulk");
    assert!(result.created.is_empty());
    assert_eq!(result.errors.len(), 1);
}

#[tokio::test]
async fn update_catalog_exercise_puts_the_patch() {
    let (server, _session, api) = setup("tok").await;
    Mock::given(method("PUT"))
        .and(path("/api/admin/exercises/12"))
        .and(body_json(json!({"intensity": "heavy"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12, "intensity": "heavy"})))
        .expect(1)
        .mount(&server)
        .await;

    let patch = CatalogExerciseInput { intensity: Some("heavy".into()), ..CatalogExerciseInput::default() };
    assert_eq!(api.update_catalog_exercise(12, &patch).await.expect("updated").intensity, "heavy");
}

#[test]
fn empty_filter_sends_no_query() {
    assert!(filter_query(&CatalogFilter::default()).is_empty());
    let filter = CatalogFilter { category: Some("functional_home".into()), per_page: Some(10), ..CatalogFilter::default() };
    assert_eq!(
        filter_query(&filter),
        vec![("category".to_owned(), "functional_home".to_owned()), ("per_page".to_owned(), "10".to_owned())]
    );
}
