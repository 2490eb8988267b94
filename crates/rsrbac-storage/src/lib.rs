//! rsrbac-storage: Storage traits and in-memory backend
//!
//! The gatekeeping pipeline only reads RBAC data (principal resolution, id
//! validation) and writes audit records. Relational backends live behind the
//! [`RbacStore`] and [`AuditSink`] traits; this crate ships the in-memory
//! implementation used by tests and the default server configuration.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryRbacStore;
pub use traits::{AuditRecord, AuditSink, RbacStore};
