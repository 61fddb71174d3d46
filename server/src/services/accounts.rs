//! Account registration, password login and account edits.
//!
//! Passwords are bcrypt-hashed on the blocking pool. Username and email are
//! unique; duplicates are reported before insert and again if the insert
//! races another registration.

use std::sync::LazyLock;

use contract::{AuthResponse, DEFAULT_LANGUAGE, LoginRequest, RegisterRequest, UpdateUserRequest, User, UserProfile};
use regex::Regex;
use sqlx::{PgPool, Row};
use tracing::info;

use super::profile;
use super::session::{self, SessionUser, user_from_row};
use crate::db::is_unique_violation;
use crate::error::ApiError;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok());

/// Workout days stored for a new profile that does not name any.
const DEFAULT_WORKOUT_DAYS: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Invalid(msg) => Self::bad_request(msg),
            AccountError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AccountError::Hash(detail) => Self::Internal(detail),
            AccountError::Db(e) => Self::Database(e),
        }
    }
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email))
}

fn bcrypt_cost() -> u32 {
    if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST }
}

async fn hash_password(password: &str) -> Result<String, AccountError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt_cost()))
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
        .map_err(|e| AccountError::Hash(e.to_string()))
}

/// Hash checked when the username is unknown, so that branch costs the same
/// bcrypt work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| bcrypt::hash("raha-unknown-user", bcrypt_cost()).ok());

async fn verify_against_dummy(password: &str) {
    let password = password.to_owned();
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = bcrypt::verify(&password, hash);
        }
    })
    .await;
}

async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Reject a register body with blank required fields or a bad email.
///
/// # Errors
///
/// Returns [`AccountError::Invalid`] naming the problem.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AccountError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AccountError::Invalid("Username, email and password are required"));
    }
    if !is_valid_email(req.email.trim()) {
        return Err(AccountError::Invalid("Invalid email format"));
    }
    Ok(())
}

async fn taken(pool: &PgPool, column: &str, value: &str, except: Option<i64>) -> Result<bool, sqlx::Error> {
    // `column` is only ever one of two literals below.
    let sql = format!("SELECT EXISTS (SELECT 1 FROM users WHERE {column} = $1 AND id IS DISTINCT FROM $2)");
    sqlx::query_scalar(&sql)
        .bind(value)
        .bind(except)
        .fetch_one(pool)
        .await
}

/// Profile written at registration: supplied fields plus the new-member
/// defaults.
#[must_use]
pub fn initial_profile(supplied: Option<UserProfile>) -> Option<UserProfile> {
    let mut p = supplied.filter(|p| !p.is_empty())?;
    p.gym_access.get_or_insert(false);
    p.workout_days_per_week.get_or_insert(DEFAULT_WORKOUT_DAYS);
    Some(p)
}

/// Create an account, its optional profile and a first session.
///
/// # Errors
///
/// Returns [`AccountError::Invalid`] for bad input or a taken username or
/// email.
pub async fn register(
    pool: &PgPool,
    req: RegisterRequest,
    ttl: std::time::Duration,
) -> Result<AuthResponse, AccountError> {
    validate_registration(&req)?;
    let username = req.username.trim();
    let email = req.email.trim();
    let language = Some(req.language.trim()).filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LANGUAGE);

    if taken(pool, "username", username, None).await? {
        return Err(AccountError::Invalid("Username already exists"));
    }
    if taken(pool, "email", email, None).await? {
        return Err(AccountError::Invalid("Email already exists"));
    }

    let hash = hash_password(&req.password).await?;
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        r"INSERT INTO users (username, email, password_hash, language)
          VALUES ($1, $2, $3, $4)
          RETURNING id, username, email, role, language, assigned_to",
    )
    .bind(username)
    .bind(email)
    .bind(&hash)
    .bind(language)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AccountError::Invalid("Username or email already exists")
        } else {
            AccountError::Db(e)
        }
    })?;
    let user = user_from_row(&row);

    if let Some(p) = initial_profile(req.profile) {
        profile::upsert(&mut *tx, user.id, &p).await?;
    }
    tx.commit().await?;

    let access_token = session::create_session(pool, user.id, ttl).await?;
    info!(user_id = user.id, username = %user.username, "accounts: registered");
    Ok(AuthResponse { access_token, user: user.to_user() })
}

/// Check a username/password pair and open a session.
///
/// # Errors
///
/// Returns [`AccountError::Invalid`] for blank fields and
/// [`AccountError::InvalidCredentials`] for a wrong pair.
pub async fn login(pool: &PgPool, req: LoginRequest, ttl: std::time::Duration) -> Result<AuthResponse, AccountError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AccountError::Invalid("Username and password are required"));
    }

    let row = sqlx::query(
        r"SELECT id, username, email, role, language, assigned_to, password_hash
          FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        verify_against_dummy(&req.password).await;
        return Err(AccountError::InvalidCredentials);
    };
    let hash: String = row.get("password_hash");
    if !verify_password(&req.password, &hash).await {
        return Err(AccountError::InvalidCredentials);
    }

    let user = user_from_row(&row);
    let access_token = session::create_session(pool, user.id, ttl).await?;
    info!(user_id = user.id, "accounts: login");
    Ok(AuthResponse { access_token, user: user.to_user() })
}

/// Apply a username/email edit for `me`.
///
/// # Errors
///
/// Returns [`AccountError::Invalid`] for a taken name or email, or a bad
/// email.
pub async fn update_account(pool: &PgPool, me: &SessionUser, req: UpdateUserRequest) -> Result<User, AccountError> {
    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty() && *u != me.username);
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty() && *e != me.email);

    if let Some(name) = username {
        if taken(pool, "username", name, Some(me.id)).await? {
            return Err(AccountError::Invalid("Username already taken"));
        }
    }
    if let Some(addr) = email {
        if !is_valid_email(addr) {
            return Err(AccountError::Invalid("Invalid email format"));
        }
        if taken(pool, "email", addr, Some(me.id)).await? {
            return Err(AccountError::Invalid("Email already taken"));
        }
    }

    let row = sqlx::query(
        r"UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email)
          WHERE id = $1
          RETURNING id, username, email, role, language, assigned_to",
    )
    .bind(me.id)
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(user_from_row(&row).to_user())
}

#[cfg(test)]
#[path = "accounts_test.rs"]
mod tests;
