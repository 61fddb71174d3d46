use super::*;
use serde_json::json;

#[test]
fn auth_failure_statuses_are_401_and_422() {
    assert!(is_auth_failure(401));
    assert!(is_auth_failure(422));
    assert!(!is_auth_failure(400));
    assert!(!is_auth_failure(403));
    assert!(!is_auth_failure(500));
}

#[test]
fn role_unknown_value_decodes_as_member() {
    let user: User = serde_json::from_value(json!({
        "id": 7, "username": "sara", "email": "s@example.com", "role": "superhero"
    }))
    .expect("user");
    assert_eq!(user.role, Role::Member);
}

#[test]
fn role_missing_defaults_to_member() {
    let user: User = serde_json::from_value(json!({"id": 1, "username": "demo"})).expect("user");
    assert_eq!(user.role, Role::Member);
    assert_eq!(user.email, "");
    assert!(user.language.is_none());
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Role::Admin).expect("role"), json!("admin"));
    assert_eq!(Role::from_db("assistant"), Role::Assistant);
}

#[test]
fn user_detail_flattens_user_fields() {
    let detail: UserDetail = serde_json::from_value(json!({
        "id": 3,
        "username": "ali",
        "email": "ali@example.com",
        "language": "en",
        "profile": {"age": 30, "injuries": ["knee"]}
    }))
    .expect("detail");
    assert_eq!(detail.user.username, "ali");
    assert_eq!(detail.user.language.as_deref(), Some("en"));
    let profile = detail.profile.expect("profile");
    assert_eq!(profile.age, Some(30));
    assert_eq!(profile.injuries, Some(vec!["knee".to_owned()]));
}

#[test]
fn user_detail_null_profile_is_none() {
    let detail: UserDetail =
        serde_json::from_value(json!({"id": 3, "username": "ali", "profile": null})).expect("detail");
    assert!(detail.profile.is_none());
}

#[test]
fn profile_skips_unset_fields() {
    let profile = UserProfile { age: Some(25), ..UserProfile::default() };
    assert_eq!(serde_json::to_value(&profile).expect("profile"), json!({"age": 25}));
    assert!(!profile.is_empty());
    assert!(UserProfile::default().is_empty());
}

#[test]
fn register_request_defaults_language() {
    let req: RegisterRequest =
        serde_json::from_value(json!({"username": "u", "email": "e@x.io", "password": "p"})).expect("req");
    assert_eq!(req.language, DEFAULT_LANGUAGE);
    assert!(req.profile.is_none());
}

#[test]
fn error_body_prefers_error_then_message() {
    let body = ErrorBody::parse(r#"{"error":"Invalid credentials","message":"Please log in"}"#).expect("body");
    assert_eq!(body.text(), Some("Invalid credentials"));

    let body = ErrorBody::parse(r#"{"message":"Please log in again"}"#).expect("body");
    assert_eq!(body.text(), Some("Please log in again"));

    let body = ErrorBody::parse(r#"{"error":"   "}"#).expect("body");
    assert_eq!(body.text(), None);
}

#[test]
fn error_body_parse_rejects_non_json() {
    assert!(ErrorBody::parse("<html>bad gateway</html>").is_none());
}

#[test]
fn chat_reply_falls_back_to_message() {
    let reply: ChatReply = serde_json::from_value(json!({"message": "hi"})).expect("reply");
    assert_eq!(reply.text(), Some("hi"));

    let reply: ChatReply = serde_json::from_value(json!({"response": "a", "message": "b"})).expect("reply");
    assert_eq!(reply.text(), Some("a"));
}

#[test]
fn action_kind_parses_every_known_name() {
    for kind in ActionKind::ALL {
        assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(kind));
    }
}

#[test]
fn action_kind_rejects_unknown_name() {
    let err = "launch_rocket".parse::<ActionKind>().unwrap_err();
    assert_eq!(err, UnknownAction("launch_rocket".to_owned()));
    assert_eq!(err.to_string(), "unknown action: launch_rocket");
}

#[test]
fn action_kind_trims_whitespace() {
    assert_eq!(" site_settings ".parse::<ActionKind>(), Ok(ActionKind::SiteSettings));
}

#[test]
fn plan_response_tolerates_missing_fields() {
    let plan: PlanResponse = serde_json::from_value(json!({"assistant_response": "ok"})).expect("plan");
    assert_eq!(plan.assistant_response, "ok");
    assert!(plan.actions.is_empty());
    assert!(plan.results.is_empty());
    assert!(plan.errors.is_empty());
    assert!(plan.session_id.is_none());
}

#[test]
fn plan_response_decodes_results() {
    let plan: PlanResponse = serde_json::from_value(json!({
        "assistant_response": "Searching",
        "actions": [{"action": "search_exercises", "params": {"query": "squat"}}],
        "results": [
            {"action": "search_exercises", "status": "ok", "data": []},
            {"action": "site_settings", "status": "error", "error": "forbidden"}
        ],
        "errors": [],
        "session_id": "abc"
    }))
    .expect("plan");
    assert_eq!(plan.actions[0].kind(), Ok(ActionKind::SearchExercises));
    assert!(plan.results[0].is_ok());
    assert!(!plan.results[1].is_ok());
    assert_eq!(plan.results[1].error.as_deref(), Some("forbidden"));
    assert_eq!(plan.session_id.as_deref(), Some("abc"));
}

#[test]
fn action_result_constructors_shape_wire_body() {
    let ok = ActionResult::ok(ActionKind::TrainerMessage, json!({"id": 4}));
    assert_eq!(
        serde_json::to_value(&ok).expect("ok"),
        json!({"action": "trainer_message", "status": "ok", "data": {"id": 4}})
    );
    let err = ActionResult::error("progress_check", "invalid_mode");
    assert_eq!(
        serde_json::to_value(&err).expect("err"),
        json!({"action": "progress_check", "status": "error", "error": "invalid_mode"})
    );
}

#[test]
fn missing_credentials_decode_as_empty() {
    let req: LoginRequest = serde_json::from_value(json!({})).expect("login");
    assert!(req.username.is_empty() && req.password.is_empty());
    let req: RegisterRequest = serde_json::from_value(json!({"username": "a", "password": "b"})).expect("register");
    assert!(req.email.is_empty());
}

#[test]
fn mistyped_credentials_still_fail() {
    assert!(serde_json::from_value::<LoginRequest>(json!({"username": 5, "password": "p"})).is_err());
}

#[test]
fn nutrition_plan_type_defaults_to_two_weeks() {
    let plan: NewNutritionPlan = serde_json::from_value(json!({"day": 2, "food_item": "Oats"})).expect("plan");
    assert_eq!(plan.plan_type, DEFAULT_NUTRITION_PLAN_TYPE);
    assert!(NUTRITION_PLAN_TYPES.contains(&plan.plan_type.as_str()));
    assert_eq!(plan.day, Some(2));
}

#[test]
fn admin_exercise_path_fills_the_id() {
    assert_eq!(paths::admin_exercise(42), "/api/admin/exercises/42");
    assert!(paths::ADMIN_EXERCISE.ends_with("{id}"));
}
