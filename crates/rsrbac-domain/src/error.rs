//! Domain error types.

use thiserror::Error;

/// Domain-level errors surfaced to callers of the resolver and services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// One or more referenced ids do not exist in the store.
    /// `missing` lists the offending ids in request order.
    #[error("{entity} not found in database: {missing:?}")]
    MissingIds { entity: &'static str, missing: Vec<i64> },

    /// Entity lookup by primary key found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Username/password authentication failed.
    #[error("invalid username or password")]
    BadCredentials,

    /// Token secret is unusable for signing.
    #[error("invalid token secret: {reason}")]
    InvalidSecret { reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
