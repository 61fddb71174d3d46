//! Server configuration parsed from environment variables.
//!
//! Every knob has a default except `DATABASE_URL`. Parsing goes through a
//! lookup function so tests never touch the process environment.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
pub const DEFAULT_AI_MAX_TOKENS: u32 = 700;
pub const DEFAULT_CHAT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl: Duration,
    /// Token cap for planner completions.
    pub ai_max_tokens: u32,
    /// Token cap for free-form chat completions.
    pub chat_max_tokens: u32,
}

impl ServerConfig {
    /// Read config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is unset or a numeric value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read config through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let ttl_hours = parse(&lookup, "SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS)?;
        if ttl_hours == 0 {
            return Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", value: "0".into() });
        }
        Ok(Self {
            database_url,
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            session_ttl: Duration::from_secs(ttl_hours * 3600),
            ai_max_tokens: parse(&lookup, "AI_MAX_TOKENS", DEFAULT_AI_MAX_TOKENS)?,
            chat_max_tokens: parse(&lookup, "CHAT_MAX_TOKENS", DEFAULT_CHAT_MAX_TOKENS)?,
        })
    }
}

/// Parse `key` with `default` when unset. Set-but-garbage is an error.
pub(crate) fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
