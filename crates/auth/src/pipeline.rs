//! Per-request authentication pipeline.
//!
//! Success path: `Unauthenticated → TokenPresent → TokenVerified →
//! SubjectResolved → AuthoritiesResolved → Attached`; `Rejected` is reachable
//! from any step. The pipeline authenticates leniently and never writes an
//! HTTP response itself: it only decides whether a [`Principal`] is attached,
//! and the downstream authorization decision turns "no principal" or "empty
//! authorities" into a 401/403.
//!
//! Failure handling is deliberately asymmetric:
//! - bad tokens, malformed claims, unknown subjects and store failures are
//!   hard rejections (the request continues unauthenticated, never with a
//!   forged identity);
//! - an identity mismatch or an unresolvable role degrades softly to a
//!   principal with an empty authority set, because authentication itself
//!   succeeded and authorization still runs downstream.

use std::collections::HashSet;
use std::sync::Arc;

use authhub_core::{CorrelationId, RoleId};

use crate::audit::{AuditEmitter, AuditScope};
use crate::authorize::RoleAssignment;
use crate::principal::Principal;
use crate::resolver::{PermissionResolver, ResolveError};
use crate::store::{PermissionCatalog, RolePermissionStore, RoleStore, UserRecord, UserStore};
use crate::token::{Claims, TokenCodec, TokenError};

const BEARER_SCHEME: &str = "Bearer ";

/// Transport-agnostic view of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub path: String,
    pub method: String,
    pub ip: String,
    /// Raw `Authorization` header value, if present.
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// Why no token work was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Path matched the public allow-list.
    PublicPath,
    /// No `Authorization` header, or the scheme is not exactly `Bearer `.
    NoBearerToken,
}

/// Hard rejection kinds. None of these attach a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    InvalidToken(TokenError),
    /// Token verified but `sub` is blank or `roleId` is missing.
    MalformedClaims,
    UserNotFound,
    /// A store call failed; fail closed rather than surface a 500 here.
    StoreFailure,
}

/// Terminal pipeline outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Anonymous pass-through; a deliberate branch, not a failure.
    Bypassed(BypassReason),
    Rejected(RejectionKind),
    Authenticated(Principal),
}

impl AuthOutcome {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthOutcome::Authenticated(p) => Some(p),
            _ => None,
        }
    }
}

/// Store bundle consumed by the pipeline (explicit constructor composition,
/// no ambient container lookups).
#[derive(Clone)]
pub struct PipelineStores {
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub role_permissions: Arc<dyn RolePermissionStore>,
    pub catalog: Arc<dyn PermissionCatalog>,
}

/// The authentication orchestrator.
///
/// Holds no cross-request mutable state: the signing key and the public-path
/// list are immutable after construction, and no lock is held across store
/// calls.
pub struct AuthPipeline {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserStore>,
    resolver: PermissionResolver,
    emitter: Arc<dyn AuditEmitter>,
    public_paths: Vec<String>,
}

impl AuthPipeline {
    pub fn new(
        codec: Arc<TokenCodec>,
        stores: PipelineStores,
        emitter: Arc<dyn AuditEmitter>,
        public_paths: Vec<String>,
    ) -> Self {
        let resolver =
            PermissionResolver::new(stores.roles, stores.role_permissions, stores.catalog);
        Self {
            codec,
            users: stores.users,
            resolver,
            emitter,
            public_paths,
        }
    }

    /// Open the audit scope for one request.
    ///
    /// The returned guard emits exactly one audit event when dropped, on
    /// every exit path, with elapsed time measured from this call.
    pub fn enter(&self, meta: &RequestMeta) -> AuditScope {
        AuditScope::enter(self.emitter.clone(), CorrelationId::new(), meta)
    }

    /// Run the authentication state machine for one request.
    pub async fn authenticate(
        &self,
        meta: &RequestMeta,
        correlation_id: CorrelationId,
    ) -> AuthOutcome {
        if self.is_public_path(&meta.path) {
            tracing::debug!(correlation_id = %correlation_id, path = %meta.path, "public path, skipping authentication");
            return AuthOutcome::Bypassed(BypassReason::PublicPath);
        }

        let Some(header) = meta.authorization.as_deref() else {
            return AuthOutcome::Bypassed(BypassReason::NoBearerToken);
        };
        let Some(token) = header.strip_prefix(BEARER_SCHEME) else {
            return AuthOutcome::Bypassed(BypassReason::NoBearerToken);
        };
        if token.trim().is_empty() {
            // Scheme marker with nothing behind it: no usable token.
            return AuthOutcome::Bypassed(BypassReason::NoBearerToken);
        }

        let claims = match self.codec.parse(token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(correlation_id = %correlation_id, error = %err, "token rejected");
                return AuthOutcome::Rejected(RejectionKind::InvalidToken(err));
            }
        };

        let Some(role_id) = valid_identity_claims(&claims) else {
            tracing::warn!(correlation_id = %correlation_id, "token claims missing subject or roleId");
            return AuthOutcome::Rejected(RejectionKind::MalformedClaims);
        };

        let user = match self.users.find_by_username(&claims.sub).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(correlation_id = %correlation_id, subject = %claims.sub, "subject not found");
                return AuthOutcome::Rejected(RejectionKind::UserNotFound);
            }
            Err(err) => {
                tracing::error!(correlation_id = %correlation_id, error = %err, "user lookup failed, failing closed");
                return AuthOutcome::Rejected(RejectionKind::StoreFailure);
            }
        };

        if claims.user_id != Some(user.id.as_i64()) {
            // Identity mismatch degrades softly: the subject authenticated,
            // but gets no authorities and no role standing at all. This
            // deliberately sheds a legacy admin marker on the record too:
            // role standing is only honored when the token's identity
            // matches the store.
            tracing::warn!(
                correlation_id = %correlation_id,
                subject = %claims.sub,
                claim_user_id = ?claims.user_id,
                store_user_id = %user.id,
                "userId claim does not match store, degrading to empty authorities"
            );
            return AuthOutcome::Authenticated(principal_from(
                &user,
                RoleAssignment::Unassigned,
                HashSet::new(),
            ));
        }

        let assignment = RoleAssignment::from_user(user.legacy_role.as_deref(), user.role_id);
        let authorities = match self.resolver.resolve(role_id).await {
            Ok(set) => set,
            Err(ResolveError::RoleNotFound(role_id)) => {
                tracing::warn!(correlation_id = %correlation_id, role_id = %role_id, "role not found, degrading to empty authorities");
                HashSet::new()
            }
            Err(ResolveError::Store(err)) => {
                tracing::error!(correlation_id = %correlation_id, error = %err, "role resolution failed, failing closed");
                return AuthOutcome::Rejected(RejectionKind::StoreFailure);
            }
        };

        tracing::debug!(
            correlation_id = %correlation_id,
            subject = %claims.sub,
            authorities = authorities.len(),
            "principal attached"
        );
        AuthOutcome::Authenticated(principal_from(&user, assignment, authorities))
    }

    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Claims gate for the `TokenVerified → SubjectResolved` transition:
/// `sub` must be non-blank and `roleId` present.
fn valid_identity_claims(claims: &Claims) -> Option<RoleId> {
    if claims.sub.trim().is_empty() {
        return None;
    }
    claims.role_id.map(RoleId::new)
}

fn principal_from(
    user: &UserRecord,
    role: RoleAssignment,
    authorities: HashSet<crate::permission::Permission>,
) -> Principal {
    Principal {
        user_id: user.id,
        username: user.username.clone(),
        full_name: user.full_name.clone(),
        email: user.email.clone(),
        role,
        authorities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::CapturingEmitter;
    use crate::permission::Permission;
    use crate::role::RoleRecord;
    use crate::store::{InMemoryDirectory, StoreError};
    use crate::token::TokenExtras;
    use async_trait::async_trait;
    use authhub_core::UserId;
    use chrono::Duration;

    fn codec() -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(
                "pipeline-test-secret-0123456789abcdef",
                Duration::hours(1),
                Duration::days(7),
            )
            .unwrap(),
        )
    }

    fn meta(path: &str, authorization: Option<String>) -> RequestMeta {
        RequestMeta {
            path: path.to_string(),
            method: "GET".to_string(),
            ip: "198.51.100.4".to_string(),
            authorization,
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".to_string()),
            referrer: None,
        }
    }

    fn user(id: i64, username: &str, role_id: Option<i64>, legacy_role: Option<&str>) -> UserRecord {
        UserRecord {
            id: UserId::new(id),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            avatar: None,
            legacy_role: legacy_role.map(str::to_string),
            role_id: role_id.map(RoleId::new),
            active: true,
        }
    }

    struct Fixture {
        pipeline: AuthPipeline,
        directory: Arc<InMemoryDirectory>,
        emitter: Arc<CapturingEmitter>,
        codec: Arc<TokenCodec>,
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::new());
        let emitter = Arc::new(CapturingEmitter::default());
        let codec = codec();
        let pipeline = AuthPipeline::new(
            codec.clone(),
            PipelineStores {
                users: directory.clone(),
                roles: directory.clone(),
                role_permissions: directory.clone(),
                catalog: directory.clone(),
            },
            emitter.clone(),
            vec!["/auth/login".into(), "/auth/register".into()],
        );
        Fixture {
            pipeline,
            directory,
            emitter,
            codec,
        }
    }

    async fn seed_editor(fx: &Fixture) -> String {
        fx.directory.insert_user(user(7, "alice", Some(3), None)).await;
        fx.directory
            .insert_role(RoleRecord {
                id: RoleId::new(3),
                name: "editor".into(),
                display_name: "Editor".into(),
                is_system: false,
            })
            .await;
        fx.directory.grant(RoleId::new(3), "post:read").await;
        fx.directory.grant(RoleId::new(3), "post:write").await;

        fx.codec
            .issue("alice", UserId::new(7), RoleId::new(3), TokenExtras::default())
            .unwrap()
    }

    #[tokio::test]
    async fn public_path_bypasses_even_without_header() {
        let fx = fixture().await;
        let outcome = fx
            .pipeline
            .authenticate(&meta("/auth/login", None), CorrelationId::new())
            .await;
        assert_eq!(outcome, AuthOutcome::Bypassed(BypassReason::PublicPath));
    }

    #[tokio::test]
    async fn public_path_match_is_prefix_based() {
        let fx = fixture().await;
        let outcome = fx
            .pipeline
            .authenticate(&meta("/auth/login/callback", None), CorrelationId::new())
            .await;
        assert_eq!(outcome, AuthOutcome::Bypassed(BypassReason::PublicPath));
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_pass_through() {
        let fx = fixture().await;
        let outcome = fx
            .pipeline
            .authenticate(&meta("/admin/users", None), CorrelationId::new())
            .await;
        assert_eq!(outcome, AuthOutcome::Bypassed(BypassReason::NoBearerToken));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_anonymous_pass_through() {
        let fx = fixture().await;
        for header in ["Basic dXNlcjpwYXNz", "bearer abc", "Bearer", "Bearer "] {
            let outcome = fx
                .pipeline
                .authenticate(
                    &meta("/admin/users", Some(header.to_string())),
                    CorrelationId::new(),
                )
                .await;
            assert_eq!(
                outcome,
                AuthOutcome::Bypassed(BypassReason::NoBearerToken),
                "header {header:?}"
            );
        }
    }

    #[tokio::test]
    async fn garbage_token_is_hard_rejected() {
        let fx = fixture().await;
        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some("Bearer not.a.token".into())),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(
            outcome,
            AuthOutcome::Rejected(RejectionKind::InvalidToken(TokenError::Malformed))
        );
    }

    #[tokio::test]
    async fn expired_token_is_hard_rejected() {
        let fx = fixture().await;
        seed_editor(&fx).await;
        let token = fx
            .codec
            .issue_with_ttl(
                "alice",
                UserId::new(7),
                RoleId::new(3),
                TokenExtras::default(),
                Duration::seconds(-5),
            )
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(
            outcome,
            AuthOutcome::Rejected(RejectionKind::InvalidToken(TokenError::Expired))
        );
    }

    #[tokio::test]
    async fn refresh_token_lacks_role_claim_and_is_rejected() {
        let fx = fixture().await;
        seed_editor(&fx).await;
        let token = fx.codec.issue_refresh("alice", UserId::new(7)).unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(outcome, AuthOutcome::Rejected(RejectionKind::MalformedClaims));
    }

    #[tokio::test]
    async fn unknown_subject_is_hard_rejected() {
        let fx = fixture().await;
        let token = fx
            .codec
            .issue("ghost", UserId::new(9), RoleId::new(3), TokenExtras::default())
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(outcome, AuthOutcome::Rejected(RejectionKind::UserNotFound));
    }

    #[tokio::test]
    async fn identity_mismatch_degrades_to_empty_authorities() {
        let fx = fixture().await;
        seed_editor(&fx).await;
        // Token claims userId 999, store says 7.
        let token = fx
            .codec
            .issue("alice", UserId::new(999), RoleId::new(3), TokenExtras::default())
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        let principal = outcome.principal().expect("soft degrade still attaches a principal");
        assert!(principal.authorities.is_empty());
        assert_eq!(principal.role, RoleAssignment::Unassigned);
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn identity_mismatch_sheds_the_legacy_admin_marker() {
        let fx = fixture().await;
        fx.directory
            .insert_user(user(7, "root", Some(3), Some("ADMIN")))
            .await;
        let token = fx
            .codec
            .issue("root", UserId::new(999), RoleId::new(3), TokenExtras::default())
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        // Unlike role-resolution failures, a mismatched identity strips all
        // role standing, so the legacy override does not authorize here.
        let principal = outcome.principal().unwrap();
        assert_eq!(principal.role, RoleAssignment::Unassigned);
        assert!(crate::authorize::authorize(principal, &Permission::new("user:read")).is_err());
    }

    #[tokio::test]
    async fn unknown_role_degrades_to_empty_authorities() {
        let fx = fixture().await;
        fx.directory.insert_user(user(7, "alice", Some(404), None)).await;
        let token = fx
            .codec
            .issue("alice", UserId::new(7), RoleId::new(404), TokenExtras::default())
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        let principal = outcome.principal().expect("role not found degrades softly");
        assert!(principal.authorities.is_empty());
    }

    #[tokio::test]
    async fn legacy_admin_marker_survives_role_degradation() {
        let fx = fixture().await;
        fx.directory
            .insert_user(user(7, "root", Some(404), Some("ADMIN")))
            .await;
        let token = fx
            .codec
            .issue("root", UserId::new(7), RoleId::new(404), TokenExtras::default())
            .unwrap();

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        let principal = outcome.principal().unwrap();
        assert_eq!(principal.role, RoleAssignment::LegacyAdmin);
        // Empty authorities, yet the legacy override still authorizes.
        assert!(principal.authorities.is_empty());
        assert!(crate::authorize::authorize(principal, &Permission::new("user:delete")).is_ok());
    }

    #[tokio::test]
    async fn happy_path_attaches_resolved_authorities() {
        let fx = fixture().await;
        let token = seed_editor(&fx).await;

        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/posts", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        let principal = outcome.principal().unwrap();
        assert_eq!(principal.user_id, UserId::new(7));
        assert_eq!(principal.role, RoleAssignment::Resolved(RoleId::new(3)));
        assert_eq!(principal.authorities.len(), 2);
        assert!(principal.has_authority(&Permission::new("post:write")));
    }

    #[tokio::test]
    async fn admin_role_gets_the_full_universe() {
        let fx = fixture().await;
        fx.directory.insert_user(user(1, "root", Some(1), None)).await;
        fx.directory
            .insert_role(RoleRecord {
                id: RoleId::new(1),
                name: "Admin".into(),
                display_name: "Administrator".into(),
                is_system: true,
            })
            .await;
        fx.directory.register_permission("user:read").await;
        fx.directory.register_permission("payment:refund").await;

        let token = fx
            .codec
            .issue("root", UserId::new(1), RoleId::new(1), TokenExtras::default())
            .unwrap();
        let outcome = fx
            .pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;

        let principal = outcome.principal().unwrap();
        assert!(principal.has_authority(&Permission::new("payment:refund")));
        assert_eq!(principal.authorities.len(), 2);
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        struct FailingUsers;
        #[async_trait]
        impl UserStore for FailingUsers {
            async fn find_by_username(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
                Err(StoreError::new("connection reset"))
            }
        }

        let directory = Arc::new(InMemoryDirectory::new());
        let codec = codec();
        let pipeline = AuthPipeline::new(
            codec.clone(),
            PipelineStores {
                users: Arc::new(FailingUsers),
                roles: directory.clone(),
                role_permissions: directory.clone(),
                catalog: directory.clone(),
            },
            Arc::new(CapturingEmitter::default()),
            vec![],
        );

        let token = codec
            .issue("alice", UserId::new(7), RoleId::new(3), TokenExtras::default())
            .unwrap();
        let outcome = pipeline
            .authenticate(
                &meta("/admin/users", Some(format!("Bearer {token}"))),
                CorrelationId::new(),
            )
            .await;
        assert_eq!(outcome, AuthOutcome::Rejected(RejectionKind::StoreFailure));
    }

    #[tokio::test]
    async fn audit_fires_once_for_every_terminal_state() {
        let fx = fixture().await;
        let token = seed_editor(&fx).await;

        let requests = [
            meta("/auth/login", None),
            meta("/admin/users", None),
            meta("/admin/users", Some("Bearer junk".into())),
            meta("/posts", Some(format!("Bearer {token}"))),
        ];

        for request in &requests {
            let mut scope = fx.pipeline.enter(request);
            let outcome = fx
                .pipeline
                .authenticate(request, scope.correlation_id())
                .await;
            if let Some(principal) = outcome.principal() {
                scope.set_username(principal.username.clone());
            }
        }

        let events = fx.emitter.events.lock().unwrap();
        assert_eq!(events.len(), requests.len());
        assert!(events.iter().all(|e| e.duration_ms < 10_000));
        assert_eq!(events.last().unwrap().username.as_deref(), Some("alice"));
    }
}
