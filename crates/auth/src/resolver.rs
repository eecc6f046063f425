//! Role → authority-set expansion.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use authhub_core::RoleId;

use crate::permission::Permission;
use crate::store::{PermissionCatalog, RolePermissionStore, RoleStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("role not found: {0}")]
    RoleNotFound(RoleId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Expands a `roleId` into a concrete set of authority strings.
///
/// Reads only the role record and the role/permission join; it never reads
/// permission entities directly, so permission renames propagate without
/// re-keying roles.
pub struct PermissionResolver {
    roles: Arc<dyn RoleStore>,
    role_permissions: Arc<dyn RolePermissionStore>,
    catalog: Arc<dyn PermissionCatalog>,
}

impl PermissionResolver {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        role_permissions: Arc<dyn RolePermissionStore>,
        catalog: Arc<dyn PermissionCatalog>,
    ) -> Self {
        Self {
            roles,
            role_permissions,
            catalog,
        }
    }

    /// Resolve `role_id` to its authority set.
    ///
    /// The designated super-role (name `"admin"`, any case) short-circuits to
    /// the full authority universe without consulting the join table — both a
    /// performance shortcut and resilience against an incomplete join.
    ///
    /// A role with zero join rows resolves to an empty set: it is a valid
    /// role that grants nothing beyond authentication.
    pub async fn resolve(&self, role_id: RoleId) -> Result<HashSet<Permission>, ResolveError> {
        let role = self
            .roles
            .find_by_id(role_id)
            .await?
            .ok_or(ResolveError::RoleNotFound(role_id))?;

        if role.is_admin() {
            let universe = self.catalog.all_names().await?;
            tracing::debug!(role_id = %role_id, count = universe.len(), "admin override: granting full authority universe");
            return Ok(universe.into_iter().map(Permission::from).collect());
        }

        let names = self.role_permissions.find_by_role_id(role_id).await?;
        tracing::debug!(role_id = %role_id, count = names.len(), "resolved role permissions");
        Ok(names.into_iter().map(Permission::from).collect())
    }
}
