//! Audit event production.
//!
//! The pipeline produces exactly one [`AuditEvent`] per request, on every
//! exit path. Persisting or queueing the event is an external concern behind
//! the [`AuditEmitter`] trait; from the pipeline's perspective emission is
//! fire-and-forget.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authhub_core::CorrelationId;

use crate::pipeline::RequestMeta;
use crate::user_agent::{classify, Browser, DeviceType, OperatingSystem};

/// One completed request's access metadata, independent of authentication
/// outcome (`username` is `None` for anonymous and rejected requests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub username: Option<String>,
    pub ip: String,
    pub endpoint: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub correlation_id: CorrelationId,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub browser: Browser,
    pub os: OperatingSystem,
    pub device_type: DeviceType,
}

/// Produced interface: consumes audit events.
///
/// Implementations must not panic back into the pipeline; failures are
/// theirs to log and swallow.
pub trait AuditEmitter: Send + Sync {
    fn publish(&self, event: AuditEvent);
}

/// Default emitter: structured log record, nothing else.
#[derive(Debug, Default)]
pub struct TracingAuditEmitter;

impl AuditEmitter for TracingAuditEmitter {
    fn publish(&self, event: AuditEvent) {
        tracing::info!(
            correlation_id = %event.correlation_id,
            username = event.username.as_deref().unwrap_or("-"),
            ip = %event.ip,
            method = %event.method,
            endpoint = %event.endpoint,
            duration_ms = event.duration_ms,
            browser = %event.browser,
            os = %event.os,
            device_type = %event.device_type,
            "access"
        );
    }
}

/// RAII guard that emits one audit event when dropped.
///
/// Created at pipeline entry; dropping it at request end (normal return,
/// error, or unwind) guarantees exactly-once emission with the elapsed time
/// measured from entry to exit.
pub struct AuditScope {
    emitter: Arc<dyn AuditEmitter>,
    correlation_id: CorrelationId,
    started_at: DateTime<Utc>,
    entered: Instant,
    ip: String,
    endpoint: String,
    method: String,
    user_agent: Option<String>,
    referrer: Option<String>,
    username: Option<String>,
}

impl AuditScope {
    pub fn enter(
        emitter: Arc<dyn AuditEmitter>,
        correlation_id: CorrelationId,
        meta: &RequestMeta,
    ) -> Self {
        Self {
            emitter,
            correlation_id,
            started_at: Utc::now(),
            entered: Instant::now(),
            ip: meta.ip.clone(),
            endpoint: meta.path.clone(),
            method: meta.method.clone(),
            user_agent: meta.user_agent.clone(),
            referrer: meta.referrer.clone(),
            username: None,
        }
    }

    /// Record the authenticated subject once known.
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = Some(username.into());
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        let profile = classify(self.user_agent.as_deref());
        let event = AuditEvent {
            username: self.username.take(),
            ip: std::mem::take(&mut self.ip),
            endpoint: std::mem::take(&mut self.endpoint),
            method: std::mem::take(&mut self.method),
            user_agent: self.user_agent.take(),
            referrer: self.referrer.take(),
            correlation_id: self.correlation_id,
            started_at: self.started_at,
            duration_ms: self.entered.elapsed().as_millis() as u64,
            browser: profile.browser,
            os: profile.os,
            device_type: profile.device_type,
        };

        // A misbehaving emitter must not take the response (or the unwind
        // already in progress) down with it.
        let emitter = self.emitter.clone();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(move || emitter.publish(event)));
        if outcome.is_err() {
            tracing::error!(correlation_id = %self.correlation_id, "audit emitter panicked; event dropped");
        }
    }
}
