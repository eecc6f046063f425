//! `authhub-auth` — token authentication and RBAC authorization core.
//!
//! This crate gates every protected request: it verifies signed tokens,
//! expands roles into concrete authority sets, attaches a request-scoped
//! [`Principal`], and emits one audit event per request. It is intentionally
//! decoupled from HTTP and storage: stores are consumed as traits, and the
//! pipeline returns a tagged outcome instead of writing responses.

pub mod audit;
pub mod authorize;
pub mod context;
pub mod permission;
pub mod pipeline;
pub mod principal;
pub mod resolver;
pub mod role;
pub mod store;
pub mod token;
pub mod user_agent;

pub use audit::{AuditEmitter, AuditEvent, AuditScope, TracingAuditEmitter};
pub use authorize::{authorize, AuthzError, RoleAssignment};
pub use context::IdentityContext;
pub use permission::Permission;
pub use pipeline::{
    AuthOutcome, AuthPipeline, BypassReason, PipelineStores, RejectionKind, RequestMeta,
};
pub use principal::Principal;
pub use resolver::{PermissionResolver, ResolveError};
pub use role::RoleRecord;
pub use store::{
    InMemoryDirectory, PermissionCatalog, RolePermissionStore, RoleStore, StoreError, UserRecord,
    UserStore,
};
pub use token::{Claims, TokenCodec, TokenError, TokenExtras};
pub use user_agent::{classify, Browser, DeviceType, OperatingSystem, UserAgentProfile};
