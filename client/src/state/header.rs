//! Default `Authorization` header of the shared HTTP client.
//!
//! `reqwest::Client` default headers are fixed at build time, so the bearer
//! value lives here instead and is attached to each outgoing request. Every
//! request built after a `sync` observes the new value.

#[cfg(test)]
#[path = "header_test.rs"]
mod header_test;

use std::sync::{Arc, RwLock};

use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::warn;

/// Whether `token` can be sent as `Authorization: Bearer <token>`.
#[must_use]
pub fn is_legal_token(token: &str) -> bool {
    HeaderValue::from_str(&format!("Bearer {token}")).is_ok()
}

#[derive(Clone, Default)]
pub struct AuthHeader {
    value: Arc<RwLock<Option<HeaderValue>>>,
}

impl AuthHeader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `Authorization: Bearer <token>`, or remove it when `token` is
    /// `None` or blank. A token that is not a legal header value removes the
    /// header.
    pub fn sync(&self, token: Option<&str>) {
        let next = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .and_then(|t| match HeaderValue::from_str(&format!("Bearer {t}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    Some(value)
                }
                Err(_) => {
                    warn!("auth header: token contains illegal header characters; header removed");
                    None
                }
            });
        match self.value.write() {
            Ok(mut slot) => *slot = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Remove the header.
    pub fn clear(&self) {
        self.sync(None);
    }

    /// Current header value, if any.
    #[must_use]
    pub fn current(&self) -> Option<HeaderValue> {
        match self.value.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.current().is_some()
    }

    /// Attach the current header to `builder`.
    pub(crate) fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.current() {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        }
    }
}
