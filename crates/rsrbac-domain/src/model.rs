//! RBAC entities and the per-request principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account that can authenticate and hold roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Password hash (bcrypt). Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A role. Users hold roles; roles hold permissions and menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    /// Unique role code, e.g. `ADMIN`. Enforced at the gate with a `ROLE_` prefix.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// A permission grant. Informational only; not enforced by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// A navigation menu entry. `parent_id` links menus into a tree; a dangling
/// parent reference is tolerated and the orphan is treated as a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: i64,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    pub sort_order: Option<i32>,
    pub parent_id: Option<i64>,
    /// Populated by the tree build; empty (never null) for leaves.
    #[serde(default)]
    pub children: Vec<Menu>,
}

impl Menu {
    /// Minimal menu for tree construction; display metadata left unset.
    pub fn new(id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            redirect: None,
            title: None,
            icon: None,
            component: None,
            hidden: None,
            sort_order: None,
            parent_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Resolved identity attached to an authenticated request.
///
/// Derived transiently from the token subject plus a store lookup; never
/// persisted. A disabled account never yields a principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    /// Role codes with the `ROLE_` prefix, e.g. `ROLE_ADMIN`.
    pub roles: Vec<String>,
}

impl Principal {
    /// Builds a principal from a user and its bare role codes.
    pub fn new(user: &User, role_codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: role_codes
                .into_iter()
                .map(|code| format!("ROLE_{code}"))
                .collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
