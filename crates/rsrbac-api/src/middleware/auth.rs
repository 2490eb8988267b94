//! Bearer-token authentication.
//!
//! Verifies the `Authorization: Bearer <token>` header and, on success,
//! attaches a [`Principal`] to the request extensions. Every failure mode
//! (missing header, wrong scheme, bad signature, expired token, unknown or
//! disabled user, subject mismatch) falls through anonymously: the request
//! continues with no principal and downstream access control decides what
//! that means.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use axum::response::Response;
use tower::{Layer, Service};
use tracing::{debug, warn};

use rsrbac_domain::{Principal, TokenService};
use rsrbac_storage::RbacStore;

/// Authorization header scheme prefix.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Tower layer that resolves bearer tokens into principals.
pub struct AuthLayer<S> {
    token_service: Arc<TokenService>,
    store: Arc<S>,
}

impl<S> AuthLayer<S> {
    pub fn new(token_service: Arc<TokenService>, store: Arc<S>) -> Self {
        Self {
            token_service,
            store,
        }
    }
}

impl<S> Clone for AuthLayer<S> {
    fn clone(&self) -> Self {
        Self {
            token_service: Arc::clone(&self.token_service),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S, Svc> Layer<Svc> for AuthLayer<S> {
    type Service = AuthService<S, Svc>;

    fn layer(&self, inner: Svc) -> Self::Service {
        AuthService {
            inner,
            token_service: Arc::clone(&self.token_service),
            store: Arc::clone(&self.store),
        }
    }
}

/// Middleware service produced by [`AuthLayer`].
pub struct AuthService<S, Svc> {
    inner: Svc,
    token_service: Arc<TokenService>,
    store: Arc<S>,
}

impl<S, Svc: Clone> Clone for AuthService<S, Svc> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            token_service: Arc::clone(&self.token_service),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S, Svc> Service<Request<Body>> for AuthService<S, Svc>
where
    S: RbacStore,
    Svc: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Svc::Future: Send + 'static,
{
    type Response = Response;
    type Error = Svc::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Svc::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let bearer = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::to_owned);

        let token_service = Arc::clone(&self.token_service);
        let store = Arc::clone(&self.store);

        // Service must be ready before call; swap keeps the original usable.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if let Some(token) = bearer {
                if let Some(principal) =
                    resolve_principal(&token_service, store.as_ref(), &token).await
                {
                    request.extensions_mut().insert(principal);
                }
            }

            inner.call(request).await
        })
    }
}

/// Resolve a bearer token into a principal, or `None` on any failure.
async fn resolve_principal<S: RbacStore>(
    token_service: &TokenService,
    store: &S,
    token: &str,
) -> Option<Principal> {
    let username = token_service.verify(token)?;

    let user = match store.user_by_username(&username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(%username, "token subject not found");
            return None;
        }
        Err(err) => {
            warn!(%username, error = %err, "user lookup failed during authentication");
            return None;
        }
    };

    if !user.enabled {
        debug!(%username, "token subject is disabled");
        return None;
    }

    // Re-check the token against the stored username after the lookup.
    if !token_service.matches(token, &user.username) {
        return None;
    }

    let roles = match store.roles_by_user(user.id).await {
        Ok(roles) => roles,
        Err(err) => {
            warn!(%username, error = %err, "role lookup failed during authentication");
            return None;
        }
    };

    Some(Principal::new(&user, roles.into_iter().map(|r| r.code)))
}
