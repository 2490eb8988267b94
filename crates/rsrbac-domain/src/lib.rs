//! rsrbac-domain: Core RBAC domain logic
//!
//! This crate contains the business logic shared by the API layer:
//! - Entities (users, roles, permissions, menus) and the request principal
//! - Token service for signed, time-limited identity tokens
//! - RBAC resolver: id-set validation and menu tree assembly
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsrbac-domain                  │
//! ├─────────────────────────────────────────────┤
//! │  model  - Entities and Principal            │
//! │  token  - HMAC-signed identity tokens       │
//! │  rbac   - Id validation & menu tree build   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod rbac;
pub mod token;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use model::{Menu, Permission, Principal, Role, User};
pub use token::TokenService;
