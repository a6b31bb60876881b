//! Permission Administration Endpoints (admin-only)
//!
//! # Endpoints
//!
//! - `GET /api/project/:uid/permissions` - list users with access flags
//! - `POST /api/project/:uid/permissions/:user_uid` - grant access
//! - `DELETE /api/project/:uid/permissions/:user_uid` - revoke access

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};

use crate::auth::AuthUser;
use crate::{AppState, HttpError};
use stimmap_core::PermissionEntry;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/project/:uid/permissions", get(list_permissions))
        .route(
            "/api/project/:uid/permissions/:user_uid",
            post(grant_permission),
        )
        .route(
            "/api/project/:uid/permissions/:user_uid",
            delete(revoke_permission),
        )
        .with_state(state)
}

/// List every user with a has-permission flag for the project
async fn list_permissions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> Result<Json<Vec<PermissionEntry>>, HttpError> {
    let entries = state
        .permission_service
        .list_for_project(&user.user_uid, &uid)
        .await?;
    Ok(Json(entries))
}

/// Grant a user access to the project (idempotent)
async fn grant_permission(
    State(state): State<AppState>,
    user: AuthUser,
    Path((uid, user_uid)): Path<(String, String)>,
) -> Result<StatusCode, HttpError> {
    state
        .permission_service
        .grant_permission(&user.user_uid, &user_uid, &uid)
        .await?;
    Ok(StatusCode::OK)
}

/// Revoke a user's access to the project
async fn revoke_permission(
    State(state): State<AppState>,
    user: AuthUser,
    Path((uid, user_uid)): Path<(String, String)>,
) -> Result<StatusCode, HttpError> {
    state
        .permission_service
        .revoke_permission(&user.user_uid, &user_uid, &uid)
        .await?;
    Ok(StatusCode::OK)
}
