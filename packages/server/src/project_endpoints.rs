//! Project Endpoints
//!
//! # Endpoints
//!
//! - `GET /api/project` - list previews visible to the requester
//! - `POST /api/project` - create a project with a seeded document (admin)
//! - `DELETE /api/project/:uid` - delete a project (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};

use crate::auth::AuthUser;
use crate::{AppState, HttpError};
use stimmap_core::{CreateProjectRequest, ProjectPreview};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/project", get(list_projects))
        .route("/api/project", post(create_project))
        .route("/api/project/:uid", delete(delete_project))
        .with_state(state)
}

/// List project previews
///
/// Admins see every project, regular users only the ones they hold a
/// permission grant for.
async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ProjectPreview>>, HttpError> {
    let previews = state.project_service.list_previews(&user.user_uid).await?;
    Ok(Json(previews))
}

/// Create a project (admin-only)
///
/// Seeds the stimulus document from the request: the problem statement
/// becomes the root item, initial stimuli its children, and the
/// related/unrelated lists are carried alongside.
async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ProjectPreview>, HttpError> {
    let preview = state
        .project_service
        .create_project(&user.user_uid, req)
        .await?;
    Ok(Json(preview))
}

/// Delete a project (admin-only)
async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> Result<StatusCode, HttpError> {
    state
        .project_service
        .delete_project(&user.user_uid, &uid)
        .await?;
    Ok(StatusCode::OK)
}
