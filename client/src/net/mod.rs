//! HTTP transport, interception and endpoint wrappers.

pub mod api;
pub mod chat;
pub mod http;
pub mod interceptor;
