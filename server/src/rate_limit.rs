//! In-memory rate limiting for AI requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters keyed by user id. Three limits apply to both chat
//! and planner calls:
//! - Per-user: 10 AI requests/min
//! - Global: 30 provider calls/min
//! - Token budget: 40k tokens/user/hour, charged after each completion
//!
//! TRADE-OFFS
//! ==========
//! Tokens are charged after the fact, so one request can overshoot the budget
//! by at most a single completion. The next request is then refused.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::{ConfigError, parse};
use crate::error::ErrorCode;

const DEFAULT_PER_USER_LIMIT: usize = 10;
const DEFAULT_PER_USER_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 30;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

const DEFAULT_TOKEN_BUDGET: u64 = 40_000;
const DEFAULT_TOKEN_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_user_limit: usize,
    pub per_user_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
    pub token_budget: u64,
    pub token_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_user_limit: DEFAULT_PER_USER_LIMIT,
            per_user_window: Duration::from_secs(DEFAULT_PER_USER_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
            token_budget: DEFAULT_TOKEN_BUDGET,
            token_window: Duration::from_secs(DEFAULT_TOKEN_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Read `RATE_LIMIT_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a set value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `RATE_LIMIT_*` overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error when a set value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secs = |key, default| parse(&lookup, key, default).map(Duration::from_secs);
        Ok(Self {
            per_user_limit: parse(&lookup, "RATE_LIMIT_PER_USER", DEFAULT_PER_USER_LIMIT)?,
            per_user_window: secs("RATE_LIMIT_PER_USER_WINDOW_SECS", DEFAULT_PER_USER_WINDOW_SECS)?,
            global_limit: parse(&lookup, "RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT)?,
            global_window: secs("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS)?,
            token_budget: parse(&lookup, "RATE_LIMIT_TOKEN_BUDGET", DEFAULT_TOKEN_BUDGET)?,
            token_window: secs("RATE_LIMIT_TOKEN_WINDOW_SECS", DEFAULT_TOKEN_WINDOW_SECS)?,
        })
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("Too many AI requests (max {limit} per {window_secs}s). Please wait a moment.")]
    PerUserExceeded { limit: usize, window_secs: u64 },
    #[error("The assistant is busy right now. Please try again shortly.")]
    GlobalExceeded { limit: usize, window_secs: u64 },
    #[error("AI usage limit reached (max {budget} tokens per {window_secs}s).")]
    TokenBudgetExceeded { budget: u64, window_secs: u64 },
}

impl ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PerUserExceeded { .. } => "E_RATE_PER_USER",
            Self::GlobalExceeded { .. } => "E_RATE_GLOBAL",
            Self::TokenBudgetExceeded { .. } => "E_TOKEN_BUDGET",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Windows>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct Windows {
    per_user: HashMap<i64, VecDeque<Instant>>,
    global: VecDeque<Instant>,
    /// Per-user token charges: (timestamp, tokens).
    tokens: HashMap<i64, VecDeque<(Instant, u64)>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(Windows::default())), config }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check the token budget, then the request windows, and record the
    /// request when all pass.
    ///
    /// # Errors
    ///
    /// Returns the first limit that would be exceeded.
    pub fn admit(&self, user_id: i64) -> Result<(), RateLimitError> {
        self.admit_at(user_id, Instant::now())
    }

    fn admit_at(&self, user_id: i64, now: Instant) -> Result<(), RateLimitError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let w = &mut *guard;
        let cfg = self.config;

        let used = {
            let charges = w.tokens.entry(user_id).or_default();
            prune(charges, now, cfg.token_window, |(at, _)| *at);
            charges.iter().map(|(_, t)| t).sum::<u64>()
        };
        if used >= cfg.token_budget {
            return Err(RateLimitError::TokenBudgetExceeded {
                budget: cfg.token_budget,
                window_secs: cfg.token_window.as_secs(),
            });
        }

        prune(&mut w.global, now, cfg.global_window, |at| *at);
        if w.global.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        let mine = w.per_user.entry(user_id).or_default();
        prune(mine, now, cfg.per_user_window, |at| *at);
        if mine.len() >= cfg.per_user_limit {
            return Err(RateLimitError::PerUserExceeded {
                limit: cfg.per_user_limit,
                window_secs: cfg.per_user_window.as_secs(),
            });
        }

        mine.push_back(now);
        w.global.push_back(now);
        Ok(())
    }

    /// Charge `tokens` against the user's budget.
    pub fn charge_tokens(&self, user_id: i64, tokens: u64) {
        self.charge_tokens_at(user_id, tokens, Instant::now());
    }

    fn charge_tokens_at(&self, user_id: i64, tokens: u64, now: Instant) {
        if tokens == 0 {
            return;
        }
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let window = self.config.token_window;
        let charges = w.tokens.entry(user_id).or_default();
        prune(charges, now, window, |(at, _)| *at);
        charges.push_back((now, tokens));
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

fn prune<T>(deque: &mut VecDeque<T>, now: Instant, window: Duration, at: impl Fn(&T) -> Instant) {
    while let Some(front) = deque.front() {
        if now.duration_since(at(front)) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
