//! HTTP application wiring (axum router + pipeline wiring).
//!
//! - `errors.rs`: consistent JSON error responses
//! - routes live in this module: the surface is small (identity probes and
//!   an admin probe), everything business-shaped belongs to host services

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use authhub_auth::{
    AuditEmitter, AuthPipeline, IdentityContext, Permission, PipelineStores, TokenCodec,
};

use crate::authz;
use crate::config::AuthConfig;
use crate::middleware;

pub mod errors;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(
    config: &AuthConfig,
    stores: PipelineStores,
    emitter: Arc<dyn AuditEmitter>,
) -> anyhow::Result<Router> {
    let codec = Arc::new(TokenCodec::new(
        &config.jwt_secret,
        config.token_ttl,
        config.refresh_ttl,
    )?);

    let pipeline = Arc::new(AuthPipeline::new(
        codec,
        stores,
        emitter,
        config.public_paths.clone(),
    ));

    let auth_state = middleware::AuthState { pipeline };

    Ok(Router::new()
        .route("/health", get(health))
        .route("/whoami", get(whoami))
        .route("/admin/users", get(admin_users))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        )))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Identity probe: who does the pipeline think I am?
async fn whoami(Extension(identity): Extension<IdentityContext>) -> axum::response::Response {
    let Some(principal) = identity.principal() else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "authentication required",
        );
    };

    let mut authorities: Vec<&str> = principal.authorities.iter().map(|p| p.as_str()).collect();
    authorities.sort_unstable();

    (
        StatusCode::OK,
        Json(json!({
            "user_id": principal.user_id,
            "username": principal.username,
            "full_name": principal.full_name,
            "email": principal.email,
            "authorities": authorities,
        })),
    )
        .into_response()
}

/// Admin probe guarded by `user:read`; exercises the 401/403 mapping.
async fn admin_users(Extension(identity): Extension<IdentityContext>) -> axum::response::Response {
    let principal = match authz::require_permission(&identity, &Permission::new("user:read")) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    (
        StatusCode::OK,
        Json(json!({
            "granted": true,
            "requested_by": principal.username,
        })),
    )
        .into_response()
}
