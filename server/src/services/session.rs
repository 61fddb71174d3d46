//! Bearer session tokens.
//!
//! ARCHITECTURE
//! ============
//! Login and register mint an opaque 32-byte hex token stored in `sessions`
//! with an expiry. Every authenticated request resolves the token back to a
//! user row in one query.
//!
//! TRADE-OFFS
//! ==========
//! Tokens are checked for shape before the database is touched, so garbage
//! headers cost nothing and map to a distinct "malformed" error.

use std::fmt::Write;
use std::time::Duration;

use contract::{Role, User};
use rand::Rng;
use sqlx::{PgPool, Row};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const TOKEN_BYTES: usize = 32;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Whether `token` has the shape [`generate_token`] produces.
#[must_use]
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// The account behind a valid session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub language: String,
    /// Trainer (assistant) this member is assigned to.
    pub assigned_to: Option<i64>,
}

impl SessionUser {
    #[must_use]
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            language: Some(self.language.clone()),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub(crate) fn user_from_row(row: &sqlx::postgres::PgRow) -> SessionUser {
    let role: String = row.get("role");
    SessionUser {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        role: Role::from_db(&role),
        language: row.get("language"),
        assigned_to: row.get("assigned_to"),
    }
}

/// Create a session for `user_id` that expires after `ttl`.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_session(pool: &PgPool, user_id: i64, ttl: Duration) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let ttl_secs = f64::from(u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX));
    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, now() + make_interval(secs => $3))")
        .bind(&token)
        .bind(user_id)
        .bind(ttl_secs)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Resolve a session token to its user. Unknown and expired tokens are both
/// `None`.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.username, u.email, u.role, u.language, u.assigned_to
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row))
}

/// Delete a session by token.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drop expired sessions. Returns how many were removed.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

/// Spawn the expired-session sweeper. Returns a handle for shutdown.
pub fn spawn_session_sweeper(pool: PgPool, every: Duration) -> JoinHandle<()> {
    info!(every_secs = every.as_secs(), "session sweeper configured");
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            match purge_expired(&pool).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "purged expired sessions"),
                Err(e) => warn!(error = %e, "session purge failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
