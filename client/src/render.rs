//! Plain-text rendering of planner replies.
//!
//! Each known action has a display template; anything else (an action this
//! build does not know yet, or data that does not match the expected shape)
//! falls back to compact JSON.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use contract::{
    ActionKind, ActionResult, ExerciseSummary, MessageSent, PlanResponse, ProfileUpdate, ProgressCheckData,
    SettingsUpdate, WorkoutPlan,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Most exercises listed inline for a search result.
const SEARCH_PREVIEW: usize = 5;

/// Render the assistant text followed by one line (or block) per result.
#[must_use]
pub fn render_plan(plan: &PlanResponse) -> String {
    let mut out = String::new();
    let text = plan.assistant_response.trim();
    if !text.is_empty() {
        out.push_str(text);
    }
    for result in &plan.results {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&render_result(result));
    }
    out
}

/// Render a single action result.
#[must_use]
pub fn render_result(result: &ActionResult) -> String {
    let kind = result.action.parse::<ActionKind>().ok();
    if !result.is_ok() {
        let name = kind.map_or(result.action.as_str(), |k| k.as_str());
        let reason = result.error.as_deref().unwrap_or("unknown error");
        return format!("✗ {name} failed: {reason}");
    }
    let data = result.data.clone().unwrap_or(Value::Null);
    let rendered = match kind {
        Some(ActionKind::SearchExercises) => decode::<Vec<ExerciseSummary>>(&data).map(|list| search(&list)),
        Some(ActionKind::CreateWorkoutPlan) => decode::<WorkoutPlan>(&data).map(|plan| workout(&plan)),
        Some(ActionKind::UpdateUserProfile) => decode::<ProfileUpdate>(&data).map(|u| {
            format!("✓ Profile of user {} updated: {}", u.user_id, keys(&u.updated))
        }),
        Some(ActionKind::ProgressCheck) => decode::<ProgressCheckData>(&data)
            .map(|p| format!("✓ Progress check #{} is {}", p.request_id, p.status)),
        Some(ActionKind::TrainerMessage) => decode::<MessageSent>(&data)
            .map(|m| format!("✓ Message #{} sent to user {}", m.id, m.recipient_id)),
        Some(ActionKind::SiteSettings) => {
            decode::<SettingsUpdate>(&data).map(|s| format!("✓ Site settings updated: {}", keys(&s.updated)))
        }
        None => None,
    };
    rendered.unwrap_or_else(|| format!("• {}: {}", result.action, compact(&data)))
}

fn decode<T: DeserializeOwned>(data: &Value) -> Option<T> {
    serde_json::from_value(data.clone()).ok()
}

fn compact(data: &Value) -> String {
    serde_json::to_string(data).unwrap_or_default()
}

fn keys(map: &Map<String, Value>) -> String {
    if map.is_empty() {
        return "nothing".to_owned();
    }
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn display_name(ex: &ExerciseSummary) -> &str {
    [ex.name.as_str(), ex.name_en.as_str(), ex.name_fa.as_str()]
        .into_iter()
        .find(|n| !n.trim().is_empty())
        .unwrap_or("unnamed exercise")
}

fn search(list: &[ExerciseSummary]) -> String {
    if list.is_empty() {
        return "✓ No matching exercises found".to_owned();
    }
    let names: Vec<&str> = list.iter().take(SEARCH_PREVIEW).map(display_name).collect();
    let more = list.len().saturating_sub(SEARCH_PREVIEW);
    let mut line = format!("✓ Found {} exercise(s): {}", list.len(), names.join(", "));
    if more > 0 {
        line.push_str(&format!(" (+{more} more)"));
    }
    line
}

fn workout(plan: &WorkoutPlan) -> String {
    let mut out = format!("✓ Workout plan for month {} ({} exercise(s))", plan.month, plan.exercises.len());
    for ex in &plan.exercises {
        out.push_str(&format!("\n  - {} [{} / {}]", display_name(ex), ex.level, ex.intensity));
    }
    let text = plan.response.trim();
    if !text.is_empty() {
        out.push('\n');
        out.push_str(text);
    }
    out
}
