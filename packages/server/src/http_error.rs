//! HTTP error responses
//!
//! Provides the consistent error body every endpoint returns on failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use stimmap_core::StateServiceError;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "NOT_AUTHORIZED" => StatusCode::UNAUTHORIZED,
            "INVALID_PROJECT" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            // Stale writes answer 403 with the authoritative state as the
            // body instead of this envelope; see the put handler. This arm
            // only covers conflicts surfacing through other endpoints.
            "VERSION_CONFLICT" => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<StateServiceError> for HttpError {
    fn from(err: StateServiceError) -> Self {
        match err {
            StateServiceError::AccessDenied => {
                HttpError::new("Not authorized", "NOT_AUTHORIZED")
            }
            StateServiceError::ProjectNotFound { uid } => HttpError::new(
                format!("Unknown project: {}", uid),
                "INVALID_PROJECT",
            ),
            StateServiceError::InvalidState(e) => HttpError::with_details(
                "Invalid state payload",
                "VALIDATION_ERROR",
                e.to_string(),
            ),
            StateServiceError::VersionConflict {
                submitted, stored, ..
            } => HttpError::with_details(
                "Version conflict",
                "VERSION_CONFLICT",
                format!("submitted: {}, stored: {}", submitted, stored),
            ),
            StateServiceError::CorruptDocument { uid, context } => {
                tracing::error!(project_uid = %uid, %context, "corrupt stimulus document");
                HttpError::new("Stored document is corrupt", "CORRUPT_DOCUMENT")
            }
            StateServiceError::DatabaseError(e) => {
                tracing::error!("database error: {}", e);
                HttpError::new("Database operation failed", "DATABASE_ERROR")
            }
        }
    }
}
