//! Session state: persisted token, auth header and the session context.

pub mod header;
pub mod session;
pub mod token_store;
