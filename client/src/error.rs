//! Client error type and user-facing messages.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use contract::is_auth_failure;

use crate::state::token_store::TokenStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

impl ClientError {
    /// HTTP status of the failed response, if one arrived.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the bearer token.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.status().is_some_and(is_auth_failure)
    }

    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Message the backend put in its error body.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_owned();
        }
        match self {
            Self::Transport(_) => "Network error. Check your connection and try again.".to_owned(),
            Self::Status { status, .. } if is_auth_failure(*status) => {
                "Your session has expired. Please log in again.".to_owned()
            }
            Self::Status { status, .. } if *status >= 500 => {
                "The server is unavailable right now. Please try again later.".to_owned()
            }
            Self::Status { status, .. } => format!("Request failed ({status})."),
            Self::Decode(_) => "Unexpected response from the server.".to_owned(),
            Self::Cancelled => "Request cancelled.".to_owned(),
            Self::InvalidBaseUrl(url) => format!("Invalid server address: {url}"),
            Self::TokenStore(e) => format!("Could not save the session: {e}"),
        }
    }
}
