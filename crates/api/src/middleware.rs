//! Authentication middleware.
//!
//! Runs the pipeline once per inbound request, attaches the resulting
//! [`IdentityContext`] to request extensions, and guarantees the audit
//! event via the pipeline's drop scope. No 401/403 is produced here:
//! rejections continue unauthenticated and the authorization guard in
//! [`crate::authz`] decides downstream.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use authhub_auth::{AuthPipeline, IdentityContext, RequestMeta};

#[derive(Clone)]
pub struct AuthState {
    pub pipeline: Arc<AuthPipeline>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let meta = request_meta(&req);

    // The scope emits exactly one audit event when dropped, including when
    // the downstream handler unwinds.
    let mut scope = state.pipeline.enter(&meta);
    let outcome = state
        .pipeline
        .authenticate(&meta, scope.correlation_id())
        .await;

    let principal = match outcome {
        authhub_auth::AuthOutcome::Authenticated(principal) => {
            scope.set_username(principal.username.clone());
            Some(principal)
        }
        _ => None,
    };

    req.extensions_mut()
        .insert(IdentityContext::new(principal, scope.correlation_id()));

    next.run(req).await
}

fn request_meta(req: &Request<Body>) -> RequestMeta {
    let header_value = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    RequestMeta {
        path: req.uri().path().to_string(),
        method: req.method().to_string(),
        ip: client_ip(req),
        authorization: header_value(header::AUTHORIZATION),
        user_agent: header_value(header::USER_AGENT),
        referrer: header_value(header::REFERER),
    }
}

/// Client address: first `X-Forwarded-For` entry when present (the app sits
/// behind a proxy in production), otherwise the peer address.
fn client_ip(req: &Request<Body>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
