//! Client-side session and request authentication for the Raha API.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`Session`] is the entry point: it persists the bearer token, keeps the
//! shared HTTP client's `Authorization` header in step with it, resolves the
//! token into a user, and clears everything when the backend rejects the
//! token. [`ApiClient`] and [`ChatClient`] ride on the same HTTP client, so
//! their failures feed the same interceptor.

pub mod error;
pub mod net;
pub mod render;
pub mod state;

pub use error::ClientError;
pub use net::api::ApiClient;
pub use net::chat::ChatClient;
pub use net::http::{HttpClient, RequestOptions};
pub use net::interceptor::{AuthPolicy, LOGIN_GRACE, ResponseInterceptor, Verdict};
pub use state::session::{AuthOutcome, Session, SessionSnapshot};
pub use state::token_store::{FileSlot, MemorySlot, TokenSlot, TokenStore, TokenStoreError};
