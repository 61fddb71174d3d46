//! Fitness coach chat.
//!
//! SYSTEM CONTEXT
//! ==============
//! `POST /api/chat` answers a free-form message through the LLM, grounded in
//! the member's profile, recent training log and a few catalog exercises
//! that are safe for them. Every answered exchange is kept in
//! `chat_history`.
//!
//! TRADE-OFFS
//! ==========
//! A failed generation is not an HTTP error: the route answers 200 with a
//! localized apology so the chat UI keeps flowing. The failure is only
//! visible in the logs.

use std::fmt::Write;

use contract::{ChatHistoryEntry, ExerciseEntry, ExerciseSummary, UserProfile};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use tracing::{debug, warn};

use super::exercises::{self, CatalogQuery};
use super::profile;
use super::session::SessionUser;
use crate::llm::{Completion, LlmChat, LlmError, Message};

const RECOMMENDED_LIMIT: usize = 5;
const RECENT_LIMIT: usize = 5;

/// Profile fields the coach asks the member to fill in.
pub const REQUIRED_PROFILE_FIELDS: [&str; 7] =
    ["age", "weight", "height", "gender", "training_level", "fitness_goals", "workout_days_per_week"];

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("no llm configured")]
    Unavailable,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("llm returned an empty reply")]
    EmptyReply,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Shown instead of a reply when generation fails.
#[must_use]
pub fn apology(language: &str) -> &'static str {
    if language == "fa" {
        "متأسفانه خطایی رخ داد. لطفاً دوباره تلاش کنید."
    } else {
        "Sorry, an error occurred. Please try again."
    }
}

/// Current UTC time in the format chat timestamps use.
#[must_use]
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

#[must_use]
pub fn missing_profile_fields(stored: Option<&UserProfile>) -> Vec<&'static str> {
    let Some(p) = stored else {
        return REQUIRED_PROFILE_FIELDS.to_vec();
    };
    let blank = |s: &Option<String>| s.as_deref().is_none_or(|s| s.trim().is_empty());
    let mut missing = Vec::new();
    if p.age.is_none_or(|a| a == 0) {
        missing.push("age");
    }
    if p.weight.is_none_or(|w| w == 0.0) {
        missing.push("weight");
    }
    if p.height.is_none_or(|h| h == 0.0) {
        missing.push("height");
    }
    if blank(&p.gender) {
        missing.push("gender");
    }
    if blank(&p.training_level) {
        missing.push("training_level");
    }
    if p.fitness_goals.as_ref().is_none_or(Vec::is_empty) {
        missing.push("fitness_goals");
    }
    if p.workout_days_per_week.is_none_or(|d| d == 0) {
        missing.push("workout_days_per_week");
    }
    missing
}

/// Hour of day from the browser's local time: RFC 3339, or Unix seconds or
/// milliseconds (read as UTC).
fn local_hour(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt.hour());
    }
    let n: i64 = raw.parse().ok()?;
    let secs = if n > 1_000_000_000_000 { n / 1000 } else { n };
    OffsetDateTime::from_unix_timestamp(secs).ok().map(OffsetDateTime::hour)
}

/// Time-of-day greeting for `local_time`.
#[must_use]
pub fn greeting(local_time: Option<&str>, language: &str) -> Option<&'static str> {
    let hour = local_hour(local_time?)?;
    let fa = language == "fa";
    Some(match hour {
        5..=11 => if fa { "صبح بخیر" } else { "Good morning" },
        12..=16 => if fa { "ظهر بخیر" } else { "Good afternoon" },
        17..=19 => if fa { "عصر بخیر" } else { "Good evening" },
        _ => if fa { "شب بخیر" } else { "Good night" },
    })
}

/// What the coach knows about the member.
#[derive(Debug, Default)]
pub struct CoachContext<'a> {
    pub profile: Option<&'a UserProfile>,
    pub recommended: &'a [ExerciseSummary],
    pub recent: &'a [ExerciseEntry],
    pub greeting: Option<&'a str>,
}

#[must_use]
pub fn system_prompt(user: &SessionUser, ctx: &CoachContext<'_>) -> String {
    let mut out = String::from(
        "You are Raha, a friendly and safety-conscious fitness coach. \
         Answer in the user's language, keep answers short and practical, \
         and never recommend exercises that conflict with the user's injuries or medical conditions.\n",
    );
    let language = if user.language == "fa" { "Persian (fa)" } else { "English (en)" };
    let _ = writeln!(out, "\nUser: {} ({language})", user.username);
    if let Some(g) = ctx.greeting {
        let _ = writeln!(out, "Greet the user with: {g}");
    }

    if let Some(p) = ctx.profile {
        let _ = writeln!(out, "\nProfile:");
        if let Some(age) = p.age {
            let _ = writeln!(out, "- age: {age}");
        }
        if let Some(gender) = &p.gender {
            let _ = writeln!(out, "- gender: {gender}");
        }
        if let Some(level) = &p.training_level {
            let _ = writeln!(out, "- training level: {level}");
        }
        if let Some(goals) = p.fitness_goals.as_ref().filter(|g| !g.is_empty()) {
            let _ = writeln!(out, "- goals: {}", goals.join(", "));
        }
        if let Some(days) = p.workout_days_per_week {
            let _ = writeln!(out, "- workout days per week: {days}");
        }
        if let Some(injuries) = p.injuries.as_ref().filter(|i| !i.is_empty()) {
            let _ = writeln!(out, "- injuries: {}", injuries.join(", "));
        }
        if let Some(conditions) = p.medical_conditions.as_ref().filter(|c| !c.is_empty()) {
            let _ = writeln!(out, "- medical conditions: {}", conditions.join(", "));
        }
        let _ = writeln!(out, "- gym access: {}", if p.gym_access == Some(true) { "yes" } else { "no" });
    }

    let missing = missing_profile_fields(ctx.profile);
    if !missing.is_empty() {
        let _ = writeln!(
            out,
            "\nThe profile is missing: {}. Suggest completing it when relevant.",
            missing.join(", ")
        );
    }
    if !ctx.recent.is_empty() {
        let names: Vec<&str> = ctx.recent.iter().map(|e| e.exercise_name.as_str()).collect();
        let _ = writeln!(out, "\nRecently logged: {}", names.join(", "));
    }
    if !ctx.recommended.is_empty() {
        let _ = writeln!(out, "\nSafe exercises from the catalog:");
        for ex in ctx.recommended {
            let _ = writeln!(out, "- {} ({}, {}, {})", ex.name, ex.target_muscle, ex.level, ex.intensity);
        }
    }
    out
}

/// Generate the coach's reply to `message`.
///
/// # Errors
///
/// Fails when no LLM is configured, the LLM call fails or returns nothing,
/// or the context cannot be loaded.
pub async fn reply(
    llm: Option<&dyn LlmChat>,
    pool: &PgPool,
    user: &SessionUser,
    message: &str,
    local_time: Option<&str>,
    max_tokens: u32,
) -> Result<Completion, ChatError> {
    let llm = llm.ok_or(ChatError::Unavailable)?;

    let stored = profile::load(pool, user.id).await?;
    let injuries = stored.as_ref().and_then(|p| p.injuries.clone()).unwrap_or_default();
    let home_only = stored.as_ref().is_some_and(|p| p.gym_access != Some(true));
    let beginner = stored.as_ref().and_then(|p| p.training_level.as_deref()) == Some("beginner");

    let catalog = exercises::load_catalog(pool, &user.language, home_only, None).await?;
    let query = CatalogQuery {
        level: if beginner { "beginner".into() } else { String::new() },
        max_results: RECOMMENDED_LIMIT,
        ..CatalogQuery::default()
    };
    let recommended = exercises::search(catalog, &query, &injuries);
    let mut recent = exercises::list_history(pool, user.id).await?;
    recent.truncate(RECENT_LIMIT);

    let ctx = CoachContext {
        profile: stored.as_ref(),
        recommended: &recommended,
        recent: &recent,
        greeting: greeting(local_time, &user.language),
    };
    let system = system_prompt(user, &ctx);
    debug!(user_id = user.id, prompt_len = system.len(), "chat: prompting coach");

    let completion = llm.complete(max_tokens, &system, &[Message::user(message)]).await?;
    if completion.text.trim().is_empty() {
        warn!(user_id = user.id, "chat: empty completion");
        return Err(ChatError::EmptyReply);
    }
    Ok(completion)
}

/// Store an answered exchange and return its timestamp.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn save(pool: &PgPool, user_id: i64, message: &str, response: &str) -> Result<String, sqlx::Error> {
    sqlx::query_scalar(
        r#"INSERT INTO chat_history (user_id, message, response) VALUES ($1, $2, $3)
           RETURNING to_char(timestamp AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS')"#,
    )
    .bind(user_id)
    .bind(message)
    .bind(response)
    .fetch_one(pool)
    .await
}

/// The user's chat history, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn history(pool: &PgPool, user_id: i64) -> Result<Vec<ChatHistoryEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, message, response,
                  to_char(timestamp AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS') AS ts
           FROM chat_history WHERE user_id = $1
           ORDER BY timestamp DESC, id DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| ChatHistoryEntry {
            id: r.get("id"),
            message: r.get("message"),
            response: r.get("response"),
            timestamp: r.get("ts"),
        })
        .collect())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
