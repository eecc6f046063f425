use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use authhub_core::UserId;

use crate::authorize::RoleAssignment;
use crate::permission::Permission;

/// The authenticated identity attached to a request.
///
/// Created once per request by the authentication pipeline, never persisted,
/// and discarded when the request scope is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: RoleAssignment,
    pub authorities: HashSet<Permission>,
}

impl Principal {
    pub fn has_authority(&self, permission: &Permission) -> bool {
        self.authorities.contains(permission)
    }
}
