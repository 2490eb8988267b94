//! Application state for HTTP handlers.

use std::sync::Arc;

use rsrbac_domain::TokenService;
use rsrbac_storage::RbacStore;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - The storage backend implementing `RbacStore`
pub struct AppState<S> {
    /// The storage backend.
    pub store: Arc<S>,
    /// Token issuance and verification.
    pub token_service: Arc<TokenService>,
}

impl<S: RbacStore> AppState<S> {
    pub fn new(store: Arc<S>, token_service: Arc<TokenService>) -> Self {
        Self {
            store,
            token_service,
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            token_service: Arc::clone(&self.token_service),
        }
    }
}
