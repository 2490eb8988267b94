//! HTTP route definitions and handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use rsrbac_domain::{rbac, Menu, Principal};
use rsrbac_storage::{AuditSink, RbacStore, StorageError};

use super::response::ApiResponse;
use super::state::AppState;
use crate::config::AppConfig;
use crate::middleware::{AuditLayer, AuthLayer, BucketMap, RateLimitLayer};

/// Default request body size limit (1MB).
/// This prevents memory exhaustion from oversized payloads.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Handlers return the envelope either way; the error arm carries no data.
type ApiResult<T> = Result<ApiResponse<T>, ApiResponse<()>>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub id: i64,
    pub username: String,
    /// Role codes with the `ROLE_` prefix.
    pub roles: Vec<String>,
    /// Permission codes granted through the user's roles.
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignMenusRequest {
    pub menu_ids: Vec<i64>,
}

/// Private helper for the authenticated admin routes.
fn api_routes<S: RbacStore>() -> Router<Arc<AppState<S>>> {
    let role_menu_routes = Router::new()
        .route(
            "/api/roles/:id/menus",
            get(get_role_menus::<S>).put(assign_role_menus::<S>),
        )
        .route_layer(from_fn(require_admin));

    Router::new()
        .route("/api/auth/login", post(login::<S>))
        .merge(role_menu_routes)
}

/// Creates the HTTP router with the full gatekeeping pipeline applied.
///
/// Layer order, outermost first: rate limiting, authentication, body size
/// limit, audit recording. The recorder runs inside authentication so it can
/// attribute activity to the resolved principal, and inside the body limit so
/// oversized payloads are rejected before being buffered.
pub fn create_router<S>(
    state: AppState<S>,
    config: &AppConfig,
    buckets: Arc<BucketMap>,
) -> Router
where
    S: RbacStore + AuditSink,
{
    let store = Arc::clone(&state.store);
    let token_service = Arc::clone(&state.token_service);
    let shared_state = Arc::new(state);

    api_routes::<S>()
        .route("/health", get(health_check))
        .with_state(shared_state)
        .layer(AuditLayer::new(
            config.audit_log.clone(),
            Arc::clone(&store),
        ))
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
        .layer(AuthLayer::new(token_service, store))
        .layer(RateLimitLayer::new(config.rate_limit.clone(), buckets))
}

// ============================================================
// Access guards
// ============================================================

/// Rejects requests that carry no principal (401) or a principal without the
/// admin role (403). The auth layer never rejects by itself; it only attaches
/// identity, and this guard is where "no principal" becomes an error.
async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<Principal>() {
        None => ApiResponse::error("Unauthorized", 401).into_response(),
        Some(principal) if !principal.has_role("ROLE_ADMIN") => {
            warn!(username = %principal.username, path = %request.uri().path(), "access denied");
            ApiResponse::error("Forbidden", 403).into_response()
        }
        Some(_) => next.run(request).await,
    }
}

// ============================================================
// Handlers
// ============================================================

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn login<S: RbacStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = state
        .store
        .user_by_username(&request.username)
        .await
        .map_err(internal_error)?
        .filter(|user| user.enabled)
        .ok_or_else(bad_credentials)?;

    // A malformed stored hash fails verification the same as a wrong password.
    let password_ok =
        bcrypt::verify(&request.password, &user.password_hash).unwrap_or(false);
    if !password_ok {
        return Err(bad_credentials());
    }

    let roles = state
        .store
        .roles_by_user(user.id)
        .await
        .map_err(internal_error)?;
    let permissions = state
        .store
        .permissions_by_user(user.id)
        .await
        .map_err(internal_error)?;

    let token = state.token_service.issue(&user.username);
    let principal = Principal::new(&user, roles.into_iter().map(|r| r.code));

    info!(username = %user.username, "user logged in");

    Ok(ApiResponse::success(
        LoginResponse {
            token,
            id: principal.id,
            username: principal.username,
            roles: principal.roles,
            permissions: permissions.into_iter().map(|p| p.code).collect(),
        },
        "Login successful",
        200,
    ))
}

async fn get_role_menus<S: RbacStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(role_id): Path<i64>,
) -> ApiResult<Vec<Menu>> {
    state
        .store
        .role_by_id(role_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| role_not_found(role_id))?;

    let menus = state
        .store
        .menus_by_role(role_id)
        .await
        .map_err(internal_error)?;

    Ok(ApiResponse::success(
        rbac::build_menu_tree(menus),
        "OK",
        200,
    ))
}

async fn assign_role_menus<S: RbacStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(role_id): Path<i64>,
    Json(request): Json<AssignMenusRequest>,
) -> ApiResult<serde_json::Value> {
    state
        .store
        .role_by_id(role_id)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| role_not_found(role_id))?;

    let existing = state
        .store
        .existing_menu_ids(&request.menu_ids)
        .await
        .map_err(internal_error)?;
    rbac::validate_ids("Menu", &request.menu_ids, &existing)
        .map_err(|err| ApiResponse::error(err.to_string(), 400))?;

    state
        .store
        .replace_role_menus(role_id, &request.menu_ids)
        .await
        .map_err(internal_error)?;

    info!(role_id, count = request.menu_ids.len(), "menus assigned to role");

    Ok(ApiResponse::success(
        serde_json::json!({ "roleId": role_id, "assigned": request.menu_ids.len() }),
        "Menus assigned successfully",
        200,
    ))
}

// ============================================================
// Error mapping
// ============================================================

fn internal_error(err: StorageError) -> ApiResponse<()> {
    error!(error = %err, "storage operation failed");
    ApiResponse::error("Internal server error", 500)
}

fn bad_credentials() -> ApiResponse<()> {
    ApiResponse::error("Invalid username or password", 401)
}

fn role_not_found(role_id: i64) -> ApiResponse<()> {
    ApiResponse::error(format!("Role not found: {role_id}"), 404)
}
