//! Planner conversations.
//!
//! Each `POST /api/ai/plan` exchange is appended to a conversation keyed by
//! a UUID `session_id`. A client that sends no id, a malformed id, or an id
//! owned by someone else gets a fresh conversation.

use contract::{ChatRole, ConversationMessage};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::llm::Message;

/// Earlier turns replayed to the planner.
pub const HISTORY_TURNS: i64 = 20;

#[must_use]
pub fn parse_session_id(raw: Option<&str>) -> Option<Uuid> {
    raw.map(str::trim).filter(|s| !s.is_empty()).and_then(|s| Uuid::parse_str(s).ok())
}

/// Resume `requested` when `user_id` owns it, otherwise start a new one.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn open(pool: &PgPool, user_id: i64, requested: Option<&str>) -> Result<Uuid, sqlx::Error> {
    if let Some(id) = parse_session_id(requested) {
        let owned: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM ai_conversations WHERE session_id = $1 AND user_id = $2)")
                .bind(id)
                .bind(user_id)
                .fetch_one(pool)
                .await?;
        if owned {
            return Ok(id);
        }
    }
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO ai_conversations (session_id, user_id) VALUES ($1, $2)")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(id)
}

/// The last `limit` turns, oldest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn recent(pool: &PgPool, session_id: Uuid, limit: i64) -> Result<Vec<ConversationMessage>, sqlx::Error> {
    let rows = sqlx::query(
        r"SELECT role, content, (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS ts
          FROM ai_messages WHERE session_id = $1
          ORDER BY id DESC LIMIT $2",
    )
    .bind(session_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .rev()
        .map(|r| ConversationMessage {
            role: if r.get::<&str, _>("role") == "assistant" { ChatRole::Assistant } else { ChatRole::User },
            content: r.get("content"),
            timestamp: r.get("ts"),
        })
        .collect())
}

/// Record one user turn and the assistant reply.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn append_exchange(pool: &PgPool, session_id: Uuid, message: &str, reply: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"INSERT INTO ai_messages (session_id, role, content)
          VALUES ($1, 'user', $2), ($1, 'assistant', $3)",
    )
    .bind(session_id)
    .bind(message)
    .bind(reply)
    .execute(pool)
    .await?;
    Ok(())
}

/// Stored turns as LLM messages.
#[must_use]
pub fn to_llm_messages(turns: &[ConversationMessage]) -> Vec<Message> {
    turns
        .iter()
        .map(|t| match t.role {
            ChatRole::User => Message::user(t.content.clone()),
            ChatRole::Assistant => Message::assistant(t.content.clone()),
        })
        .collect()
}

#[cfg(test)]
#[path = "conversations_test.rs"]
mod tests;
