use serde::{Deserialize, Serialize};

use authhub_core::RoleId;

/// Designated super-role name. A role with this name (any case) resolves to
/// the full authority universe without consulting the join table.
pub const ADMIN_ROLE_NAME: &str = "admin";

/// Role record as owned by the external role store.
///
/// Roles own their permissions through an explicit `role_permissions` join
/// (see [`crate::store::RolePermissionStore`]), never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub is_system: bool,
}

impl RoleRecord {
    /// Case-insensitive check for the designated super-role.
    pub fn is_admin(&self) -> bool {
        self.name.eq_ignore_ascii_case(ADMIN_ROLE_NAME)
    }
}
