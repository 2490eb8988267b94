//! In-memory storage implementation.
//!
//! Backs tests and the default server configuration. Uses DashMap for
//! thread-safe concurrent access; join tables are plain id sets.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use rsrbac_domain::{Menu, Permission, Role, User};

use crate::error::{StorageError, StorageResult};
use crate::traits::{AuditRecord, AuditSink, RbacStore};

/// In-memory implementation of [`RbacStore`] and [`AuditSink`].
///
/// Lookups are O(1) on primary keys; the `existing_*_ids` filters preserve
/// the order of the requested ids, matching the relational backends'
/// `WHERE id IN (...)` contract used by the resolver's missing-id reporting.
#[derive(Debug, Default)]
pub struct MemoryRbacStore {
    users: DashMap<i64, User>,
    roles: DashMap<i64, Role>,
    permissions: DashMap<i64, Permission>,
    menus: DashMap<i64, Menu>,
    /// user_id -> role ids
    user_roles: DashMap<i64, HashSet<i64>>,
    /// role_id -> permission ids
    role_permissions: DashMap<i64, HashSet<i64>>,
    /// role_id -> menu ids
    role_menus: DashMap<i64, HashSet<i64>>,
    /// Written audit records, newest last.
    audit_log: std::sync::Mutex<Vec<AuditRecord>>,
}

impl MemoryRbacStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // Seeding helpers for tests and the default backend.

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    pub fn insert_permission(&self, permission: Permission) {
        self.permissions.insert(permission.id, permission);
    }

    pub fn insert_menu(&self, menu: Menu) {
        self.menus.insert(menu.id, menu);
    }

    pub fn assign_role(&self, user_id: i64, role_id: i64) {
        self.user_roles.entry(user_id).or_default().insert(role_id);
    }

    pub fn assign_permission(&self, role_id: i64, permission_id: i64) {
        self.role_permissions
            .entry(role_id)
            .or_default()
            .insert(permission_id);
    }

    pub fn assign_menu(&self, role_id: i64, menu_id: i64) {
        self.role_menus.entry(role_id).or_default().insert(menu_id);
    }

    /// Snapshot of the written audit records, in write order.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RbacStore for MemoryRbacStore {
    async fn user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn role_by_id(&self, id: i64) -> StorageResult<Option<Role>> {
        Ok(self.roles.get(&id).map(|r| r.value().clone()))
    }

    async fn roles_by_user(&self, user_id: i64) -> StorageResult<Vec<Role>> {
        let Some(role_ids) = self.user_roles.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut roles: Vec<Role> = role_ids
            .iter()
            .filter_map(|id| self.roles.get(id).map(|r| r.value().clone()))
            .collect();
        roles.sort_by_key(|r| r.id);
        Ok(roles)
    }

    async fn permissions_by_user(&self, user_id: i64) -> StorageResult<Vec<Permission>> {
        let role_ids: Vec<i64> = self
            .user_roles
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        let mut seen = HashSet::new();
        let mut permissions = Vec::new();
        for role_id in role_ids {
            if let Some(perm_ids) = self.role_permissions.get(&role_id) {
                for perm_id in perm_ids.iter() {
                    if seen.insert(*perm_id) {
                        if let Some(p) = self.permissions.get(perm_id) {
                            permissions.push(p.value().clone());
                        }
                    }
                }
            }
        }
        permissions.sort_by_key(|p| p.id);
        Ok(permissions)
    }

    async fn existing_role_ids(&self, ids: &[i64]) -> StorageResult<Vec<i64>> {
        Ok(ids
            .iter()
            .filter(|id| self.roles.contains_key(id))
            .copied()
            .collect())
    }

    async fn existing_menu_ids(&self, ids: &[i64]) -> StorageResult<Vec<i64>> {
        Ok(ids
            .iter()
            .filter(|id| self.menus.contains_key(id))
            .copied()
            .collect())
    }

    async fn menus_by_role(&self, role_id: i64) -> StorageResult<Vec<Menu>> {
        let Some(menu_ids) = self.role_menus.get(&role_id) else {
            return Ok(Vec::new());
        };
        let mut menus: Vec<Menu> = menu_ids
            .iter()
            .filter_map(|id| self.menus.get(id).map(|m| m.value().clone()))
            .collect();
        menus.sort_by_key(|m| m.id);
        Ok(menus)
    }

    async fn replace_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StorageResult<()> {
        if !self.roles.contains_key(&role_id) {
            return Err(StorageError::NotFound {
                entity: "Role",
                id: role_id,
            });
        }
        self.role_menus
            .insert(role_id, menu_ids.iter().copied().collect());
        tracing::debug!(role_id, count = menu_ids.len(), "replaced role menu set");
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemoryRbacStore {
    async fn write(&self, record: AuditRecord) -> StorageResult<()> {
        self.audit_log
            .lock()
            .map_err(|_| StorageError::InternalError {
                message: "audit log mutex poisoned".to_string(),
            })?
            .push(record);
        Ok(())
    }
}
