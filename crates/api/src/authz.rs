//! API-side authorization guard.
//!
//! The pipeline authenticates leniently; this is where the 401/403 decision
//! is made: no principal means the request never authenticated (401), and a
//! principal without the required authority is forbidden (403).

use axum::http::StatusCode;
use axum::response::Response;

use authhub_auth::{authorize, IdentityContext, Permission, Principal};

use crate::app::errors;

/// Require `permission` in the current request context.
///
/// Returns the principal on success so handlers can use the identity
/// without re-reading extensions.
pub fn require_permission<'a>(
    identity: &'a IdentityContext,
    permission: &Permission,
) -> Result<&'a Principal, Response> {
    let Some(principal) = identity.principal() else {
        return Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "authentication required",
        ));
    };

    authorize(principal, permission).map_err(|e| {
        tracing::debug!(
            correlation_id = %identity.correlation_id(),
            username = %principal.username,
            permission = %permission,
            "authorization denied"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })?;

    Ok(principal)
}
