//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for business logic failures.

use crate::db::DatabaseError;
use crate::models::{StateValidationError, VersionedState};
use thiserror::Error;

/// Service operation errors
///
/// Covers the business rules of the state store: access control, project
/// resolution, payload validation, and optimistic concurrency. The HTTP
/// layer maps each variant to a status code.
#[derive(Error, Debug)]
pub enum StateServiceError {
    /// Requester may not touch this project (unknown user included)
    #[error("Access denied")]
    AccessDenied,

    /// No project row for the given uid
    #[error("Unknown project: {uid}")]
    ProjectNotFound { uid: String },

    /// Submitted payload fails the tree invariants
    #[error("Invalid state payload: {0}")]
    InvalidState(#[from] StateValidationError),

    /// Optimistic concurrency failure; carries the authoritative state so
    /// the caller can recover without a second round trip
    #[error("Version conflict: submitted version {submitted}, stored version {stored}")]
    VersionConflict {
        submitted: i64,
        stored: i64,
        current: Box<VersionedState>,
    },

    /// Stored stimulus blob failed to (de)serialize
    #[error("Corrupt stimulus document for project {uid}: {context}")]
    CorruptDocument { uid: String, context: String },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl StateServiceError {
    /// Create a project not found error
    pub fn project_not_found(uid: impl Into<String>) -> Self {
        Self::ProjectNotFound { uid: uid.into() }
    }

    /// Create a version conflict error carrying the authoritative state
    pub fn version_conflict(submitted: i64, stored: i64, current: VersionedState) -> Self {
        Self::VersionConflict {
            submitted,
            stored,
            current: Box::new(current),
        }
    }

    /// Create a corrupt document error
    pub fn corrupt_document(uid: impl Into<String>, context: impl Into<String>) -> Self {
        Self::CorruptDocument {
            uid: uid.into(),
            context: context.into(),
        }
    }
}
