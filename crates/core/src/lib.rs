//! `authhub-core` — foundation building blocks shared by the auth crates.
//!
//! This crate contains **pure** primitives (typed identifiers and the error
//! model); no I/O, no HTTP, no storage concerns.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CorrelationId, RoleId, UserId};
