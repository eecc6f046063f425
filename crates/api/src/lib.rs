//! HTTP adapter: axum middleware driving the authentication pipeline,
//! request-scoped identity extraction, and the 401/403 authorization guard.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
