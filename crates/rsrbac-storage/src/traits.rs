//! RbacStore and AuditSink trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use rsrbac_domain::{Menu, Permission, Role, User};

use crate::error::StorageResult;

/// One completed request's activity record.
///
/// Immutable after creation; the recorder builds it once per request and
/// hands it to an [`AuditSink`]. Absent bodies are `None`, never `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub method: String,
    /// Full URL including query string, possibly truncated.
    pub url: String,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    /// Acting principal's username; `None` for anonymous requests.
    pub actor_username: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Read access to the authoritative RBAC store.
///
/// Implementations must be thread-safe (Send + Sync). The pipeline only
/// performs point lookups and id-set filtering; list/paging concerns stay in
/// the out-of-scope service layer.
#[async_trait]
pub trait RbacStore: Send + Sync + 'static {
    /// Looks up a user by unique username.
    async fn user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Looks up a role by id.
    async fn role_by_id(&self, id: i64) -> StorageResult<Option<Role>>;

    /// Roles granted to a user.
    async fn roles_by_user(&self, user_id: i64) -> StorageResult<Vec<Role>>;

    /// Permissions granted to a user through its roles.
    async fn permissions_by_user(&self, user_id: i64) -> StorageResult<Vec<Permission>>;

    /// Returns the subset of `ids` that exist as roles.
    async fn existing_role_ids(&self, ids: &[i64]) -> StorageResult<Vec<i64>>;

    /// Returns the subset of `ids` that exist as menus.
    async fn existing_menu_ids(&self, ids: &[i64]) -> StorageResult<Vec<i64>>;

    /// Flat menu grants for a role (no tree structure).
    async fn menus_by_role(&self, role_id: i64) -> StorageResult<Vec<Menu>>;

    /// Replaces a role's menu assignment atomically.
    async fn replace_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StorageResult<()>;
}

/// Write access for audit records.
///
/// Kept separate from [`RbacStore`] so the recorder can be wired to a
/// dedicated sink (queue, append-only table) without the full store.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    /// Persists one record. Callers at the recorder boundary swallow failures.
    async fn write(&self, record: AuditRecord) -> StorageResult<()>;
}
