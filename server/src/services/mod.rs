//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence so route handlers can
//! stay focused on request decoding, auth plumbing and status codes.

pub mod accounts;
pub mod actions;
pub mod catalog;
pub mod chat;
pub mod conversations;
pub mod exercises;
pub mod nutrition;
pub mod planner;
pub mod profile;
pub mod session;
pub mod workout;
