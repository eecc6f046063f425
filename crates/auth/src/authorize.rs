//! Downstream authorization decision.
//!
//! The pipeline authenticates leniently; this module is where "no principal"
//! or "empty authorities" becomes an actual denial. It is a pure policy
//! check: no I/O, no panics, no business logic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use authhub_core::RoleId;

use crate::permission::Permission;
use crate::principal::Principal;

/// Legacy role marker value on the user record that grants everything.
pub const LEGACY_ADMIN_MARKER: &str = "ADMIN";

/// How a principal's role was established.
///
/// Users carry both a deprecated enum-valued `role` field and a `role_id`
/// foreign key. The union makes the dual representation explicit: the legacy
/// admin marker is a first-class override, not an incidental code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleAssignment {
    /// Legacy `role == "ADMIN"`: authorization succeeds regardless of what
    /// `role_id` resolution produced.
    LegacyAdmin,
    /// Role resolved through the `role_id` foreign key.
    Resolved(RoleId),
    /// No usable role (e.g. identity mismatch degraded the request).
    Unassigned,
}

impl RoleAssignment {
    pub fn from_user(legacy_role: Option<&str>, role_id: Option<RoleId>) -> Self {
        match (legacy_role, role_id) {
            (Some(marker), _) if marker == LEGACY_ADMIN_MARKER => Self::LegacyAdmin,
            (_, Some(id)) => Self::Resolved(id),
            _ => Self::Unassigned,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Authorize `principal` for `required`.
///
/// Grant order: legacy admin marker, wildcard authority, then exact set
/// membership. Everything else is a denial.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.role == RoleAssignment::LegacyAdmin {
        return Ok(());
    }

    if principal.authorities.iter().any(|p| p.is_wildcard()) {
        return Ok(());
    }

    if principal.has_authority(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.clone()))
    }
}
