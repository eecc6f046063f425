//! Consumed store interfaces.
//!
//! Persistence is an external collaborator: the core only depends on these
//! traits. Implementations may block on I/O; the pipeline never holds a lock
//! across a store call, and a failed lookup is terminal for that request
//! (retries belong to the implementation, not here).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use authhub_core::{RoleId, UserId};

use crate::role::RoleRecord;

/// Store-layer failure. Deliberately opaque: the pipeline fails closed on
/// any store error rather than inspecting causes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("store failure: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// User record as owned by the external user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: Option<String>,
    /// Legacy role marker (enum-valued string, e.g. `"ADMIN"`). Deprecated
    /// in favor of `role_id` but still honored by the authorization layer.
    pub legacy_role: Option<String>,
    pub role_id: Option<RoleId>,
    pub active: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_id(&self, role_id: RoleId) -> Result<Option<RoleRecord>, StoreError>;
}

#[async_trait]
pub trait RolePermissionStore: Send + Sync {
    /// Permission names joined to `role_id`. May contain duplicates; the
    /// resolver deduplicates.
    async fn find_by_role_id(&self, role_id: RoleId) -> Result<Vec<String>, StoreError>;
}

/// The universe of known authority names. Consulted only for the admin
/// override, where the full set is granted without reading the join table.
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    async fn all_names(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory directory implementing all four store traits.
///
/// Used by tests and demo wiring; production lookups live behind the same
/// traits in whatever persistence layer the host application brings.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
    roles: RwLock<HashMap<RoleId, RoleRecord>>,
    role_permissions: RwLock<HashMap<RoleId, Vec<String>>>,
    catalog: RwLock<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserRecord) {
        self.users.write().await.insert(user.username.clone(), user);
    }

    pub async fn insert_role(&self, role: RoleRecord) {
        self.roles.write().await.insert(role.id, role);
    }

    pub async fn grant(&self, role_id: RoleId, permission: impl Into<String>) {
        let permission = permission.into();
        self.role_permissions
            .write()
            .await
            .entry(role_id)
            .or_default()
            .push(permission.clone());

        let mut catalog = self.catalog.write().await;
        if !catalog.contains(&permission) {
            catalog.push(permission);
        }
    }

    /// Register a permission name in the universe without granting it.
    pub async fn register_permission(&self, permission: impl Into<String>) {
        let permission = permission.into();
        let mut catalog = self.catalog.write().await;
        if !catalog.contains(&permission) {
            catalog.push(permission);
        }
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }
}

#[async_trait]
impl RoleStore for InMemoryDirectory {
    async fn find_by_id(&self, role_id: RoleId) -> Result<Option<RoleRecord>, StoreError> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }
}

#[async_trait]
impl RolePermissionStore for InMemoryDirectory {
    async fn find_by_role_id(&self, role_id: RoleId) -> Result<Vec<String>, StoreError> {
        Ok(self
            .role_permissions
            .read()
            .await
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryDirectory {
    async fn all_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog.read().await.clone())
    }
}
