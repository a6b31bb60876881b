//! Versioned State Endpoints
//!
//! # Endpoints
//!
//! - `GET /api/project/:uid/state` - read the current versioned state
//! - `PUT /api/project/:uid/state` - replace it, guarded by the version
//!
//! A stale PUT answers `403 Forbidden` with the authoritative
//! `VersionedState` as the body, so a conflicting client can recover
//! without a follow-up read. Every other failure uses the standard error
//! envelope.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};

use crate::auth::AuthUser;
use crate::{AppState, HttpError};
use stimmap_core::{StateServiceError, VersionedState};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/project/:uid/state", get(get_state))
        .route("/api/project/:uid/state", put(put_state))
        .with_state(state)
}

/// Read the current state of a project
async fn get_state(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
) -> Result<Json<VersionedState>, HttpError> {
    let versioned = state.state_service.get_state(&user.user_uid, &uid).await?;
    Ok(Json(versioned))
}

/// Replace a project's state
///
/// The submitted body carries the payload plus the version it was based
/// on. Responses:
///
/// - `200 OK` with the stored state (version incremented by 1)
/// - `403 Forbidden` with the authoritative state when the version is stale
/// - `400 Bad Request` when the payload breaks the tree invariants or the
///   project uid is unknown
/// - `401 Unauthorized` when the requester may not touch the project
async fn put_state(
    State(state): State<AppState>,
    user: AuthUser,
    Path(uid): Path<String>,
    Json(candidate): Json<VersionedState>,
) -> Response {
    match state
        .state_service
        .put_state(&user.user_uid, &uid, candidate)
        .await
    {
        Ok(accepted) => (StatusCode::OK, Json(accepted)).into_response(),
        Err(StateServiceError::VersionConflict { current, .. }) => {
            (StatusCode::FORBIDDEN, Json(*current)).into_response()
        }
        Err(e) => HttpError::from(e).into_response(),
    }
}
