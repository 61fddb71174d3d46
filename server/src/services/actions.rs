//! Executors for planned actions.
//!
//! SYSTEM CONTEXT
//! ==============
//! After `services::planner` has normalized a plan, every action runs here in
//! order, as the requesting user. Each produces one [`ActionResult`]; a
//! failure is reported in that result and never stops the remaining actions.
//!
//! DESIGN
//! ======
//! Every executor is split into a pure step that reads params and applies
//! role rules (returning a snake_case error code on refusal) and an async
//! step that touches the database. Database errors are logged and reported
//! as `internal_error` so SQL details never reach the model or the client.

use contract::{ActionKind, ActionResult, MessageSent, PlannedAction, ProfileUpdate, ProgressCheckData, Role, SettingsUpdate};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use super::exercises::{self, CatalogQuery, DEFAULT_MAX_RESULTS};
use super::profile;
use super::session::SessionUser;
use super::workout;

/// Catalog rows loaded as the workout plan pool.
const PLAN_POOL_LIMIT: i64 = 50;

/// Site settings keys the planner may write.
pub const SITE_SETTINGS_FIELDS: [&str; 14] = [
    "contact_email",
    "contact_phone",
    "address_fa",
    "address_en",
    "app_description_fa",
    "app_description_en",
    "instagram_url",
    "telegram_url",
    "whatsapp_url",
    "twitter_url",
    "facebook_url",
    "linkedin_url",
    "youtube_url",
    "copyright_text",
];

/// Why an action was refused or failed.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Refused(&'static str),
    #[error("internal_error")]
    Db(#[from] sqlx::Error),
    #[error("internal_error")]
    Encode(#[from] serde_json::Error),
}

type ActionOutcome = Result<Value, ActionError>;

fn to_value(data: impl Serialize) -> ActionOutcome {
    Ok(serde_json::to_value(data)?)
}

// =============================================================================
// PARAM HELPERS
// =============================================================================

/// Trimmed string param; non-strings read as empty.
fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).map_or("", str::trim)
}

/// Integer id from a JSON number or numeric string.
fn as_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The `fields` object. Missing or null reads as empty.
fn fields_param(params: &Map<String, Value>) -> Result<Map<String, Value>, &'static str> {
    match params.get("fields") {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(m)) => Ok(m.clone()),
        Some(_) => Err("fields_must_be_object"),
    }
}

/// Language for localized results: the param when it names a supported
/// language, else the request language.
fn language_param<'a>(params: &'a Map<String, Value>, fallback: &'a str) -> &'a str {
    match str_param(params, "language") {
        lang @ ("fa" | "en") => lang,
        _ => fallback,
    }
}

// =============================================================================
// PURE STEPS
// =============================================================================

/// Build the catalog query for `search_exercises`.
#[must_use]
pub fn search_query(params: &Map<String, Value>) -> CatalogQuery {
    let max_results = params
        .get("max_results")
        .and_then(as_id)
        .filter(|n| *n != 0)
        .map_or(DEFAULT_MAX_RESULTS, |n| usize::try_from(n.max(0)).unwrap_or(0));
    CatalogQuery {
        text: str_param(params, "query").to_owned(),
        target_muscle: str_param(params, "target_muscle").to_owned(),
        level: str_param(params, "level").to_lowercase(),
        intensity: str_param(params, "intensity").to_lowercase(),
        max_results,
    }
}

/// Whose profile `update_user_profile` writes. Only an admin may name
/// another user.
///
/// # Errors
///
/// `invalid_user_id` or `forbidden`.
pub fn profile_target(me: &SessionUser, params: &Map<String, Value>) -> Result<i64, &'static str> {
    let target = match params.get("user_id") {
        None | Some(Value::Null) => return Ok(me.id),
        Some(v) => as_id(v).ok_or("invalid_user_id")?,
    };
    if !me.is_admin() && target != me.id {
        return Err("forbidden");
    }
    Ok(target)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStep {
    /// A member asks their trainer for a progress check.
    Request,
    /// Staff accept or deny a pending request.
    Respond { request_id: i64, status: &'static str },
}

/// Decide what `progress_check` does for `me`.
///
/// # Errors
///
/// `only_member_can_request`, `forbidden`, `invalid_status`,
/// `invalid_request_id` or `invalid_mode`.
pub fn progress_step(me: &SessionUser, params: &Map<String, Value>) -> Result<ProgressStep, &'static str> {
    match str_param(params, "mode").to_lowercase().as_str() {
        "request" => {
            if me.role == Role::Member {
                Ok(ProgressStep::Request)
            } else {
                Err("only_member_can_request")
            }
        }
        "respond" => {
            if me.role == Role::Member {
                return Err("forbidden");
            }
            let status = match str_param(params, "status").to_lowercase().as_str() {
                "accepted" => "accepted",
                "denied" => "denied",
                _ => return Err("invalid_status"),
            };
            let request_id = params.get("request_id").and_then(as_id).ok_or("invalid_request_id")?;
            Ok(ProgressStep::Respond { request_id, status })
        }
        _ => Err("invalid_mode"),
    }
}

/// Body and recipient for `trainer_message`. A member always writes to their
/// assigned trainer; staff must name a recipient.
///
/// # Errors
///
/// `body_required`, `no_trainer_assigned`, `recipient_id_required` or
/// `invalid_recipient_id`.
pub fn message_target(me: &SessionUser, params: &Map<String, Value>) -> Result<(String, i64), &'static str> {
    let body = str_param(params, "body");
    if body.is_empty() {
        return Err("body_required");
    }
    let recipient = if me.role == Role::Member {
        me.assigned_to.ok_or("no_trainer_assigned")?
    } else {
        match params.get("recipient_id") {
            None | Some(Value::Null) => return Err("recipient_id_required"),
            Some(v) => as_id(v).ok_or("invalid_recipient_id")?,
        }
    };
    Ok((body.to_owned(), recipient))
}

/// Whether staff `me` may message a user with `recipient_role` who is
/// assigned to `recipient_trainer`. Members are only reachable by admins and
/// their own trainer.
///
/// # Errors
///
/// `invalid_recipient` or `forbidden`.
pub fn check_recipient(me: &SessionUser, recipient_role: Role, recipient_trainer: Option<i64>) -> Result<(), &'static str> {
    if recipient_role != Role::Member {
        return Err("invalid_recipient");
    }
    if me.role == Role::Assistant && recipient_trainer != Some(me.id) {
        return Err("forbidden");
    }
    Ok(())
}

/// Allowed, text-valued settings from `site_settings` params. Admin only.
///
/// # Errors
///
/// `forbidden` or `fields_must_be_object`.
pub fn settings_patch(me: &SessionUser, params: &Map<String, Value>) -> Result<Vec<(&'static str, Option<String>)>, &'static str> {
    if !me.is_admin() {
        return Err("forbidden");
    }
    let fields = fields_param(params)?;
    Ok(SITE_SETTINGS_FIELDS
        .iter()
        .filter_map(|key| {
            let text = match fields.get(*key)? {
                Value::Null => None,
                Value::String(s) => Some(s.trim().to_owned()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                Value::Array(_) | Value::Object(_) => return None,
            };
            Some((*key, text))
        })
        .collect())
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Run `actions` in order as `me`.
pub async fn execute_all(pool: &PgPool, me: &SessionUser, language: &str, actions: &[PlannedAction]) -> Vec<ActionResult> {
    let mut results = Vec::with_capacity(actions.len());
    for planned in actions {
        let Ok(kind) = planned.kind() else {
            results.push(ActionResult::error(planned.action.clone(), "unsupported_action"));
            continue;
        };
        let outcome = execute(pool, me, language, kind, &planned.params).await;
        results.push(match outcome {
            Ok(data) => ActionResult::ok(kind, data),
            Err(ActionError::Refused(code)) => {
                info!(user_id = me.id, action = %kind, code, "action refused");
                ActionResult::error(kind.as_str(), code)
            }
            Err(e) => {
                warn!(user_id = me.id, action = %kind, error = ?e, "action failed");
                ActionResult::error(kind.as_str(), e.to_string())
            }
        });
    }
    results
}

async fn execute(pool: &PgPool, me: &SessionUser, language: &str, kind: ActionKind, params: &Map<String, Value>) -> ActionOutcome {
    match kind {
        ActionKind::SearchExercises => search_exercises(pool, me, language, params).await,
        ActionKind::CreateWorkoutPlan => create_workout_plan(pool, me, language, params).await,
        ActionKind::UpdateUserProfile => update_user_profile(pool, me, params).await,
        ActionKind::ProgressCheck => progress_check(pool, me, params).await,
        ActionKind::TrainerMessage => trainer_message(pool, me, params).await,
        ActionKind::SiteSettings => site_settings(pool, me, params).await,
    }
}

/// Injuries and home-only flag from the stored profile. Without gym access,
/// only the home category is offered.
async fn training_limits(pool: &PgPool, user_id: i64) -> Result<(Vec<String>, bool), sqlx::Error> {
    let stored = profile::load(pool, user_id).await?;
    Ok(match stored {
        Some(p) => (p.injuries.unwrap_or_default(), !p.gym_access.unwrap_or(false)),
        None => (Vec::new(), false),
    })
}

async fn search_exercises(pool: &PgPool, me: &SessionUser, language: &str, params: &Map<String, Value>) -> ActionOutcome {
    let query = search_query(params);
    let (injuries, home_only) = training_limits(pool, me.id).await?;
    let catalog = exercises::load_catalog(pool, language_param(params, language), home_only, None).await?;
    to_value(exercises::search(catalog, &query, &injuries))
}

async fn create_workout_plan(pool: &PgPool, me: &SessionUser, language: &str, params: &Map<String, Value>) -> ActionOutcome {
    let month = workout::month_from_param(params.get("month"));
    let target = str_param(params, "target_muscle");
    let language = language_param(params, language);
    let (injuries, home_only) = training_limits(pool, me.id).await?;
    let pool_rows = exercises::load_catalog(pool, language, home_only, Some(PLAN_POOL_LIMIT)).await?;
    to_value(workout::build_plan(pool_rows, month, target, &injuries, language))
}

async fn update_user_profile(pool: &PgPool, me: &SessionUser, params: &Map<String, Value>) -> ActionOutcome {
    let fields = fields_param(params).map_err(ActionError::Refused)?;
    let target = profile_target(me, params).map_err(ActionError::Refused)?;
    if target != me.id {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(target)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(ActionError::Refused("not_found"));
        }
    }
    let (patch, updated) = profile::patch_from_fields(&fields);
    profile::upsert(pool, target, &patch).await?;
    to_value(ProfileUpdate { user_id: target, updated })
}

async fn progress_check(pool: &PgPool, me: &SessionUser, params: &Map<String, Value>) -> ActionOutcome {
    let data = match progress_step(me, params).map_err(ActionError::Refused)? {
        ProgressStep::Request => {
            let row = sqlx::query("INSERT INTO progress_check_requests (member_id) VALUES ($1) RETURNING id, status")
                .bind(me.id)
                .fetch_one(pool)
                .await?;
            ProgressCheckData { request_id: row.get("id"), status: row.get("status") }
        }
        ProgressStep::Respond { request_id, status } => {
            let row = sqlx::query(
                r"UPDATE progress_check_requests
                  SET status = $2, responded_by = $3, responded_at = now()
                  WHERE id = $1
                  RETURNING id, status",
            )
            .bind(request_id)
            .bind(status)
            .bind(me.id)
            .fetch_optional(pool)
            .await?
            .ok_or(ActionError::Refused("not_found"))?;
            ProgressCheckData { request_id: row.get("id"), status: row.get("status") }
        }
    };
    to_value(data)
}

async fn trainer_message(pool: &PgPool, me: &SessionUser, params: &Map<String, Value>) -> ActionOutcome {
    let (body, recipient_id) = message_target(me, params).map_err(ActionError::Refused)?;
    if me.role != Role::Member {
        let row = sqlx::query("SELECT role, assigned_to FROM users WHERE id = $1")
            .bind(recipient_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ActionError::Refused("invalid_recipient"))?;
        let role = Role::from_db(row.get::<&str, _>("role"));
        check_recipient(me, role, row.get("assigned_to")).map_err(ActionError::Refused)?;
    }
    let id: i64 = sqlx::query_scalar("INSERT INTO trainer_messages (sender_id, recipient_id, body) VALUES ($1, $2, $3) RETURNING id")
        .bind(me.id)
        .bind(recipient_id)
        .bind(&body)
        .fetch_one(pool)
        .await?;
    to_value(MessageSent { id, recipient_id })
}

async fn site_settings(pool: &PgPool, me: &SessionUser, params: &Map<String, Value>) -> ActionOutcome {
    let patch = settings_patch(me, params).map_err(ActionError::Refused)?;
    let mut updated = Map::new();
    if !patch.is_empty() {
        let columns: Vec<&str> = patch.iter().map(|(k, _)| *k).collect();
        let placeholders: Vec<String> = (2..=patch.len() + 1).map(|i| format!("${i}")).collect();
        let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect();
        let sql = format!(
            "INSERT INTO site_settings (id, {}) VALUES ($1, {}) ON CONFLICT (id) DO UPDATE SET {}, updated_at = now()",
            columns.join(", "),
            placeholders.join(", "),
            assignments.join(", "),
        );
        let mut query = sqlx::query(&sql).bind(1_i16);
        for (_, value) in &patch {
            query = query.bind(value.as_deref());
        }
        query.execute(pool).await?;
        for (key, value) in patch {
            updated.insert(key.to_owned(), value.map_or(Value::Null, Value::String));
        }
    }
    to_value(SettingsUpdate { updated })
}

#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;
