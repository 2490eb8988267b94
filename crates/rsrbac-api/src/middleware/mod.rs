//! Gatekeeping middleware.
//!
//! The pipeline runs outermost to innermost:
//! 1. Rate limiting (admission control), which may short-circuit with 429
//! 2. Bearer-token authentication, which attaches a [`rsrbac_domain::Principal`]
//! 3. Audit logging, which captures request and response bodies for the sink
//!
//! In Axum, layers are applied bottom to top: the last `.layer()` call is the
//! outermost middleware that runs first.

mod audit;
mod auth;
mod rate_limit;

pub use audit::AuditLayer;
pub use auth::{AuthLayer, BEARER_PREFIX};
pub use rate_limit::{BucketMap, RateLimitLayer, TokenBucket};

/// Exclusion check shared by the rate limiter and the recorder: a configured
/// prefix matches the path exactly or as a parent segment (`prefix + "/"`).
pub(crate) fn is_excluded(path: &str, exclude_paths: &[String]) -> bool {
    exclude_paths
        .iter()
        .any(|prefix| path == prefix || path.starts_with(&format!("{prefix}/")))
}
