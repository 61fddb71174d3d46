use serde_json::json;

use super::*;

fn ok(action: &str, data: Value) -> ActionResult {
    ActionResult { action: action.to_owned(), status: contract::ResultStatus::Ok, data: Some(data), error: None }
}

#[test]
fn error_result_names_action_and_reason() {
    let line = render_result(&ActionResult::error("site_settings", "forbidden"));
    assert_eq!(line, "✗ site_settings failed: forbidden");
}

#[test]
fn search_lists_names_with_overflow() {
    let items: Vec<Value> = (1..=7).map(|i| json!({"id": i, "name": format!("Ex{i}")})).collect();
    let line = render_result(&ok("search_exercises", Value::Array(items)));
    assert_eq!(line, "✓ Found 7 exercise(s): Ex1, Ex2, Ex3, Ex4, Ex5 (+2 more)");
}

#[test]
fn search_falls_back_to_english_name() {
    let line = render_result(&ok("search_exercises", json!([{"id": 1, "name": "", "name_en": "Plank"}])));
    assert_eq!(line, "✓ Found 1 exercise(s): Plank");
}

#[test]
fn empty_search_says_so() {
    assert_eq!(render_result(&ok("search_exercises", json!([]))), "✓ No matching exercises found");
}

#[test]
fn workout_plan_lists_exercises_then_text() {
    let line = render_result(&ok(
        "create_workout_plan",
        json!({
            "month": 2,
            "response": "Rest 60s between sets.",
            "exercises": [{"id": 1, "name": "Squat", "level": "beginner", "intensity": "light"}],
            "safety_checked": true
        }),
    ));
    assert_eq!(
        line,
        "✓ Workout plan for month 2 (1 exercise(s))\n  - Squat [beginner / light]\nRest 60s between sets."
    );
}

#[test]
fn profile_update_lists_fields() {
    let line = render_result(&ok("update_user_profile", json!({"user_id": 3, "updated": {"age": 30, "weight": 70}})));
    assert_eq!(line, "✓ Profile of user 3 updated: age, weight");
}

#[test]
fn progress_and_message_templates() {
    assert_eq!(
        render_result(&ok("progress_check", json!({"request_id": 8, "status": "pending"}))),
        "✓ Progress check #8 is pending"
    );
    assert_eq!(
        render_result(&ok("trainer_message", json!({"id": 4, "recipient_id": 11}))),
        "✓ Message #4 sent to user 11"
    );
    assert_eq!(
        render_result(&ok("site_settings", json!({"updated": {}}))),
        "✓ Site settings updated: nothing"
    );
}

#[test]
fn unknown_action_renders_compact_json() {
    let line = render_result(&ok("book_massage", json!({"slot": "9am"})));
    assert_eq!(line, r#"• book_massage: {"slot":"9am"}"#);
}

#[test]
fn mismatched_data_falls_back_to_json() {
    let line = render_result(&ok("search_exercises", json!({"unexpected": true})));
    assert_eq!(line, r#"• search_exercises: {"unexpected":true}"#);
}

#[test]
fn plan_renders_text_then_results() {
    let plan = PlanResponse {
        assistant_response: "Done.".into(),
        results: vec![ok("trainer_message", json!({"id": 1, "recipient_id": 2}))],
        ..PlanResponse::default()
    };
    assert_eq!(render_plan(&plan), "Done.\n✓ Message #1 sent to user 2");
}
