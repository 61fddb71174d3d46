//! AI action planner.
//!
//! SYSTEM CONTEXT
//! ==============
//! `POST /api/ai/plan` asks the LLM for a strict JSON plan of the shape
//! `{assistant_response, actions: [{action, params}]}`. This module owns the
//! prompt, pulls the JSON object out of whatever the model actually wrote,
//! and normalizes the actions against the closed [`ActionKind`] set and each
//! action's parameter spec. Executing the actions is `services::actions`.
//!
//! DESIGN
//! ======
//! Normalization never fails the request. Bad items are reported as string
//! errors next to the surviving actions; an action that lacks a required
//! parameter is reported but still kept, and its executor decides what to
//! do with the gap. Unknown parameter keys are dropped.

use contract::{ActionKind, PlannedAction, Role};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::llm::{LlmChat, Message};

// =============================================================================
// ACTION SPECS
// =============================================================================

/// Parameter keys an action accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl ActionSpec {
    #[must_use]
    pub fn allows(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }
}

#[must_use]
pub fn spec(kind: ActionKind) -> ActionSpec {
    match kind {
        ActionKind::SearchExercises => ActionSpec {
            required: &[],
            optional: &["query", "target_muscle", "level", "intensity", "max_results", "language"],
        },
        ActionKind::CreateWorkoutPlan => ActionSpec { required: &[], optional: &["month", "target_muscle", "language"] },
        ActionKind::UpdateUserProfile => ActionSpec { required: &["fields"], optional: &["user_id"] },
        ActionKind::ProgressCheck => ActionSpec { required: &["mode"], optional: &["request_id", "status"] },
        ActionKind::TrainerMessage => ActionSpec { required: &["body"], optional: &["recipient_id"] },
        ActionKind::SiteSettings => ActionSpec { required: &["fields"], optional: &[] },
    }
}

// =============================================================================
// PROMPT
// =============================================================================

const SYSTEM_PROMPT: &str = "You are an action planner for a fitness platform. \
Return ONLY valid JSON with keys: assistant_response (string) and actions (array). \
Each action must be an object with keys: action (string), params (object). \
Allowed actions: search_exercises, create_workout_plan, update_user_profile, \
progress_check, trainer_message, site_settings. \
Do not include markdown or explanations. \
If no action is needed, return an empty actions array.";

const ACTION_SCHEMAS: &str = "Action schemas:\n\
- search_exercises: params { query?, target_muscle?, level?, intensity?, max_results?, language? }\n\
- create_workout_plan: params { month?, target_muscle?, language? }\n\
- update_user_profile: params { user_id?, fields (object) }\n\
- progress_check: params { mode ('request'|'respond'), request_id?, status? }\n\
- trainer_message: params { recipient_id?, body }\n\
- site_settings: params { fields (object) }\n\
Return JSON now.";

/// System prompt for the planner.
#[must_use]
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// The final user turn sent to the model.
#[must_use]
pub fn user_prompt(message: &str, language: &str, role: Role) -> String {
    format!(
        "UserRole: {}\nLanguage: {language}\nMessage: {message}\n{ACTION_SCHEMAS}",
        role.as_str()
    )
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("ai_provider_unavailable")]
    ProviderUnavailable,
    #[error("invalid_json")]
    InvalidJson,
}

impl ErrorCode for PlanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable => "E_AI_PROVIDER_UNAVAILABLE",
            Self::InvalidJson => "E_INVALID_JSON",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// Reply used whenever no usable plan came back.
#[must_use]
pub fn fallback_response(language: &str) -> &'static str {
    if language == "fa" {
        "متأسفانه الان نمی‌توانم اقدام خودکار انجام دهم. لطفاً دوباره تلاش کنید."
    } else {
        "I cannot perform automated actions right now. Please try again."
    }
}

/// Cut the JSON object out of model output: drop a leading code fence (and
/// its `json` tag), then keep the first `{` through the last `}`.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.split("```").next().unwrap_or(rest);
        let body = cleaned.trim_start();
        if let Some(untagged) = body.strip_prefix("json") {
            cleaned = untagged;
        }
    }
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    (end > start).then(|| &cleaned[start..=end])
}

/// Falsy values stand in for an empty params object.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) => false,
    }
}

/// Validate `payload.actions` against the action specs.
#[must_use]
pub fn normalize_actions(payload: &Map<String, Value>) -> (Vec<PlannedAction>, Vec<String>) {
    let mut errors = Vec::new();
    let items = match payload.get("actions") {
        None | Some(Value::Null) => return (Vec::new(), errors),
        Some(Value::Array(items)) => items,
        Some(_) => return (Vec::new(), vec!["actions must be a list".to_owned()]),
    };

    let mut actions = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Some(item) = item.as_object() else {
            errors.push(format!("action[{idx}] must be object"));
            continue;
        };
        let name = item.get("action").and_then(Value::as_str).unwrap_or("");
        let Ok(kind) = name.parse::<ActionKind>() else {
            errors.push(format!("action[{idx}] invalid action"));
            continue;
        };
        let empty = Map::new();
        let params = match item.get("params") {
            None => &empty,
            Some(v) if is_blank(v) => &empty,
            Some(Value::Object(p)) => p,
            Some(_) => {
                errors.push(format!("action[{idx}].params must be object"));
                continue;
            }
        };
        let spec = spec(kind);
        for req in spec.required {
            if !params.contains_key(*req) {
                errors.push(format!("action[{idx}] missing required param: {req}"));
            }
        }
        let sanitized: Map<String, Value> = params
            .iter()
            .filter(|(k, _)| spec.allows(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        actions.push(PlannedAction { action: kind.as_str().to_owned(), params: sanitized });
    }
    (actions, errors)
}

/// A normalized plan ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub assistant_response: String,
    pub actions: Vec<PlannedAction>,
    pub errors: Vec<String>,
}

impl Plan {
    #[must_use]
    pub fn failed(err: PlanError, language: &str) -> Self {
        Self { assistant_response: fallback_response(language).to_owned(), actions: Vec::new(), errors: vec![err.to_string()] }
    }
}

/// Turn raw model output into a [`Plan`].
#[must_use]
pub fn parse_plan(raw: &str, language: &str) -> Plan {
    if raw.trim().is_empty() {
        return Plan::failed(PlanError::ProviderUnavailable, language);
    }
    let Some(json_text) = extract_json(raw) else {
        return Plan::failed(PlanError::InvalidJson, language);
    };
    let Ok(payload) = serde_json::from_str::<Value>(json_text) else {
        return Plan::failed(PlanError::InvalidJson, language);
    };
    let empty = Map::new();
    let obj = payload.as_object().unwrap_or(&empty);
    let (actions, errors) = normalize_actions(obj);
    let assistant_response = obj
        .get("assistant_response")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map_or_else(|| fallback_response(language).to_owned(), str::to_owned);
    Plan { assistant_response, actions, errors }
}

/// Ask `llm` for a plan. `history` is earlier turns of the same
/// conversation, oldest first. Returns the plan and the tokens spent.
pub async fn plan(
    llm: Option<&dyn LlmChat>,
    max_tokens: u32,
    message: &str,
    language: &str,
    role: Role,
    history: &[Message],
) -> (Plan, u64) {
    let Some(llm) = llm else {
        debug!("planner: no llm configured");
        return (Plan::failed(PlanError::ProviderUnavailable, language), 0);
    };
    let mut messages = history.to_vec();
    messages.push(Message::user(user_prompt(message, language, role)));

    match llm.complete(max_tokens, system_prompt(), &messages).await {
        Ok(completion) => {
            let tokens = completion.total_tokens();
            if completion.truncated {
                warn!(tokens, "planner: completion hit the token cap");
            }
            (parse_plan(&completion.text, language), tokens)
        }
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "planner: llm call failed");
            (Plan::failed(PlanError::ProviderUnavailable, language), 0)
        }
    }
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
