//! Response interception for the shared HTTP client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every request sent through [`super::http::HttpClient`] reports its failure
//! to each registered [`ResponseInterceptor`]. The session registers one that
//! clears local auth state when the backend rejects the bearer token.
//!
//! DESIGN
//! ======
//! The decision itself is [`AuthPolicy::classify`], a pure function of the
//! request path, the failure status, the grace flag and whether the request
//! predates the latest login. Side effects live in the interceptor that
//! consults it.
//!
//! Two mechanisms protect a fresh login from racing requests:
//! - a grace window of [`LOGIN_GRACE`] after each successful login, during
//!   which auth failures pass through;
//! - a login generation stamped on every request at send time. A request
//!   stamped with an older generation than the current one is stale and can
//!   never clear the session, however late it fails.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contract::{is_auth_failure, paths};
use reqwest::Method;
use tokio::time::Instant;

/// How long auth failures are ignored after a successful login.
pub const LOGIN_GRACE: Duration = Duration::from_secs(3);

// =============================================================================
// REQUEST CONTEXT
// =============================================================================

/// What an interceptor knows about the failed request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    /// Path relative to the base URL, including any query string.
    pub path: String,
    /// Login generation observed when the request was sent.
    pub generation: u64,
}

/// Observer of failed responses.
pub trait ResponseInterceptor: Send + Sync {
    /// Called once per failed request. `status` is `None` for transport
    /// failures where no response arrived.
    fn on_error(&self, ctx: &RequestContext, status: Option<u16>);
}

// =============================================================================
// LOGIN GENERATION
// =============================================================================

/// Monotonic counter bumped on every successful login.
#[derive(Clone, Debug, Default)]
pub struct LoginEpoch(Arc<AtomicU64>);

impl LoginEpoch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Start a new generation and return it.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether a request stamped with `generation` predates the current login.
    #[must_use]
    pub fn is_stale(&self, generation: u64) -> bool {
        generation < self.current()
    }
}

// =============================================================================
// GRACE WINDOW
// =============================================================================

/// Post-login grace state. Expiry is evaluated lazily against the clock, so
/// no timer task is needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraceWindow {
    until: Option<Instant>,
}

impl GraceWindow {
    pub fn enter(&mut self, now: Instant, length: Duration) {
        self.until = Some(now + length);
    }

    pub fn reset(&mut self) {
        self.until = None;
    }

    #[must_use]
    pub fn is_active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }
}

// =============================================================================
// POLICY
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    PassThrough,
    ClearSession,
}

#[derive(Clone, Debug)]
pub struct AuthPolicy {
    pub grace: Duration,
    /// Paths whose failures never touch the session.
    pub exempt_paths: Vec<String>,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            grace: LOGIN_GRACE,
            exempt_paths: vec![paths::LOGIN.to_owned(), paths::REGISTER.to_owned()],
        }
    }
}

impl AuthPolicy {
    #[must_use]
    pub fn is_exempt(&self, path: &str) -> bool {
        let bare = path.split(['?', '#']).next().unwrap_or(path);
        let bare = bare.trim_end_matches('/');
        self.exempt_paths.iter().any(|p| p == bare)
    }

    /// Decide what a failed request means for the session.
    #[must_use]
    pub fn classify(&self, path: &str, status: Option<u16>, in_grace: bool, stale: bool) -> Verdict {
        let Some(status) = status else {
            return Verdict::PassThrough;
        };
        if !is_auth_failure(status) || self.is_exempt(path) || in_grace || stale {
            return Verdict::PassThrough;
        }
        Verdict::ClearSession
    }
}
