//! Session context: token, user, loading flag and the operations that
//! mutate them.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`Session`] is built once per process and shared by cloning. It owns the
//! [`TokenStore`], the [`HttpClient`] (and through it the `Authorization`
//! header), and registers a [`SessionGuard`] interceptor on that client.
//! All state changes go through `initialize`, `refresh`, `login`, `register`
//! and `logout`.
//!
//! DESIGN
//! ======
//! - After every token mutation the header is re-synced from the same value.
//! - Login and register are sent without the shared header, so a stale token
//!   never rides along and a failed login leaves the previous session intact.
//! - A successful login sets `user` from the login body, opens the grace
//!   window and advances the login generation.
//! - Auth failures only clear the session when the rejected request belongs
//!   to the current login and the grace window is closed.
//!
//! TRADE-OFFS
//! ==========
//! Locks are std locks held for a handful of instructions and never across an
//! await. Readers may observe a user and token from adjacent generations for
//! the duration of a single mutation.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use contract::{AuthResponse, LoginRequest, RegisterRequest, User, paths};
use reqwest::Method;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::header::{AuthHeader, is_legal_token};
use super::token_store::{TokenSlot, TokenStore};
use crate::error::ClientError;
use crate::net::http::{HttpClient, RequestOptions};
use crate::net::interceptor::{AuthPolicy, GraceWindow, LoginEpoch, RequestContext, ResponseInterceptor, Verdict};

const LOGIN_FALLBACK: &str = "Login failed. Please try again.";
const REGISTER_FALLBACK: &str = "Registration failed. Please try again.";

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Point-in-time copy of the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
    pub loading: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Result of `login` or `register`. Never an `Err`: failures carry a
/// displayable message.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthOutcome {
    Success { user: User },
    Failure { error: String },
    Cancelled,
}

impl AuthOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            _ => None,
        }
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

pub(crate) struct SessionState {
    store: TokenStore,
    header: AuthHeader,
    epoch: LoginEpoch,
    policy: AuthPolicy,
    user: RwLock<Option<User>>,
    loading: AtomicBool,
    grace: Mutex<GraceWindow>,
}

impl SessionState {
    fn user(&self) -> Option<User> {
        match self.user.read() {
            Ok(user) => user.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_user(&self, next: Option<User>) {
        match self.user.write() {
            Ok(mut user) => *user = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    fn with_grace<R>(&self, f: impl FnOnce(&mut GraceWindow) -> R) -> R {
        match self.grace.lock() {
            Ok(mut grace) => f(&mut grace),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn in_grace(&self) -> bool {
        let now = Instant::now();
        self.with_grace(|g| g.is_active(now))
    }

    /// Drop token, header and user. Idempotent.
    fn clear(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "session: token store clear failed");
        }
        self.header.clear();
        self.set_user(None);
    }

    /// Whether an auth failure seen on `path` for a request of `generation`
    /// should end the session.
    fn verdict(&self, path: &str, status: Option<u16>, generation: u64) -> Verdict {
        self.policy
            .classify(path, status, self.in_grace(), self.epoch.is_stale(generation))
    }
}

/// Interceptor that clears the session on a rejected bearer token.
pub struct SessionGuard {
    state: Arc<SessionState>,
}

impl ResponseInterceptor for SessionGuard {
    fn on_error(&self, ctx: &RequestContext, status: Option<u16>) {
        match self.state.verdict(&ctx.path, status, ctx.generation) {
            Verdict::ClearSession => {
                info!(path = %ctx.path, ?status, "session: token rejected; clearing session");
                self.state.clear();
            }
            Verdict::PassThrough => {
                debug!(path = %ctx.path, ?status, "session: failure passed through");
            }
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Clone)]
pub struct Session {
    state: Arc<SessionState>,
    http: HttpClient,
}

impl Session {
    /// Session against `base_url`, persisting the token in `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid HTTP(S) URL.
    pub fn new(base_url: &str, slot: Arc<dyn TokenSlot>) -> Result<Self, ClientError> {
        Self::with_policy(base_url, slot, AuthPolicy::default())
    }

    /// Like [`Session::new`] with a custom interception policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid HTTP(S) URL.
    pub fn with_policy(base_url: &str, slot: Arc<dyn TokenSlot>, policy: AuthPolicy) -> Result<Self, ClientError> {
        let http = HttpClient::new(base_url)?;
        let store = TokenStore::new(slot);
        http.header().sync(store.get().as_deref());

        let state = Arc::new(SessionState {
            store,
            header: http.header().clone(),
            epoch: http.epoch().clone(),
            policy,
            user: RwLock::new(None),
            loading: AtomicBool::new(true),
            grace: Mutex::new(GraceWindow::default()),
        });
        http.register(Arc::new(SessionGuard { state: state.clone() }));
        Ok(Self { state, http })
    }

    /// The shared HTTP client. Requests sent through it are intercepted.
    #[must_use]
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.store.get()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.user()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.loading.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn in_grace(&self) -> bool {
        self.state.in_grace()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { token: self.token(), user: self.user(), loading: self.is_loading() }
    }

    // =========================================================================
    // FETCHER
    // =========================================================================

    /// Resolve the stored token into a user at start-up.
    ///
    /// No token: settles with no user. Rejected token: clears it. Any other
    /// failure keeps the token and settles with no user.
    pub async fn initialize(&self) -> SessionSnapshot {
        self.state.set_user(None);
        self.fetch_user().await;
        self.snapshot()
    }

    /// Re-fetch the current user. Unlike `initialize`, a network or server
    /// failure keeps the user already known.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. A rejected token has already been cleared
    /// when this returns.
    pub async fn refresh(&self) -> Result<Option<User>, ClientError> {
        match self.fetch_user().await {
            Some(err) => Err(err),
            None => Ok(self.user()),
        }
    }

    async fn fetch_user(&self) -> Option<ClientError> {
        self.state.loading.store(true, Ordering::Release);
        let result = self.fetch_user_inner().await;
        self.state.loading.store(false, Ordering::Release);
        result
    }

    async fn fetch_user_inner(&self) -> Option<ClientError> {
        let Some(token) = self.state.store.get() else {
            self.state.header.clear();
            self.state.set_user(None);
            return None;
        };
        if !is_legal_token(&token) {
            warn!("session: stored token is not a legal header value; cleared");
            self.state.clear();
            return None;
        }
        self.state.header.sync(Some(&token));
        let generation = self.state.epoch.current();

        match self.http.get::<User>(paths::USER).await {
            Ok(user) => {
                if self.state.store.get().as_deref() == Some(token.as_str()) && !self.state.epoch.is_stale(generation) {
                    debug!(user_id = user.id, "session: user loaded");
                    self.state.set_user(Some(user));
                } else {
                    debug!("session: token changed during fetch; result dropped");
                }
                None
            }
            Err(err) => {
                if err.is_auth_failure() {
                    let still_current = self.state.store.get().as_deref() == Some(token.as_str());
                    let verdict = self.state.verdict(paths::USER, err.status(), generation);
                    if still_current && verdict == Verdict::ClearSession {
                        self.state.clear();
                    }
                } else {
                    warn!(error = %err, "session: user fetch failed; token kept");
                }
                Some(err)
            }
        }
    }

    // =========================================================================
    // AUTH ACTIONS
    // =========================================================================

    /// Log in with username and password.
    pub async fn login(&self, username: &str, password: &str) -> AuthOutcome {
        self.login_with(username, password, None).await
    }

    /// [`Session::login`] with a cancellation token checked before the
    /// session is touched.
    pub async fn login_with(&self, username: &str, password: &str, cancel: Option<CancellationToken>) -> AuthOutcome {
        let body = LoginRequest { username: username.trim().to_owned(), password: password.to_owned() };
        self.authenticate(paths::LOGIN, &body, cancel, LOGIN_FALLBACK).await
    }

    /// Create an account and log in as it.
    pub async fn register(&self, request: &RegisterRequest) -> AuthOutcome {
        self.register_with(request, None).await
    }

    /// [`Session::register`] with a cancellation token.
    pub async fn register_with(&self, request: &RegisterRequest, cancel: Option<CancellationToken>) -> AuthOutcome {
        self.authenticate(paths::REGISTER, request, cancel, REGISTER_FALLBACK).await
    }

    async fn authenticate<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: Option<CancellationToken>,
        fallback: &str,
    ) -> AuthOutcome {
        let opts = RequestOptions::anonymous().with_cancel(cancel.clone());
        let result = self.http.send::<B, AuthResponse>(Method::POST, path, Some(body), opts).await;
        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return AuthOutcome::Cancelled;
        }
        match result {
            Ok(reply) => self.establish(reply, fallback),
            Err(ClientError::Cancelled) => AuthOutcome::Cancelled,
            Err(err) => {
                info!(path, error = %err, "session: authentication rejected");
                let error = match &err {
                    ClientError::Status { message: Some(m), .. } => m.clone(),
                    ClientError::Transport(_) => err.user_message(),
                    _ => fallback.to_owned(),
                };
                AuthOutcome::Failure { error }
            }
        }
    }

    fn establish(&self, reply: AuthResponse, fallback: &str) -> AuthOutcome {
        let token = reply.access_token.trim();
        if token.is_empty() {
            warn!("session: auth reply carried no token");
            return AuthOutcome::Failure { error: fallback.to_owned() };
        }
        if !is_legal_token(token) {
            warn!("session: auth reply token is not a legal header value");
            return AuthOutcome::Failure { error: fallback.to_owned() };
        }
        if let Err(e) = self.state.store.set(token) {
            warn!(error = %e, "session: token store write failed");
            return AuthOutcome::Failure { error: ClientError::from(e).user_message() };
        }
        self.state.header.sync(Some(token));
        self.state.epoch.advance();
        let now = Instant::now();
        let grace = self.state.policy.grace;
        self.state.with_grace(|g| g.enter(now, grace));
        self.state.set_user(Some(reply.user.clone()));
        self.state.loading.store(false, Ordering::Release);
        info!(user_id = reply.user.id, "session: authenticated");
        AuthOutcome::Success { user: reply.user }
    }

    /// Drop the session locally. No request is sent.
    pub fn logout(&self) {
        self.state.clear();
        self.state.with_grace(GraceWindow::reset);
        self.state.loading.store(false, Ordering::Release);
        info!("session: logged out");
    }
}
