//! Versioned State Store
//!
//! Reads and writes the per-project stimulus document under optimistic
//! concurrency control.
//!
//! # Write protocol
//!
//! A write submits the full payload together with the version it was based
//! on. The store compares that version to the stored one under a write lock:
//!
//! - match: the payload replaces the stored one, version increments by 1,
//!   and the new `VersionedState` is returned
//! - mismatch: nothing is written and the error carries the authoritative
//!   stored `VersionedState` so the caller can recover without another read
//!
//! The lock serializes the read-compare-write sequence across concurrent
//! writers (all paths go through one shared `StateService`), so two writes
//! based on the same version can never both succeed.

use crate::db::DatabaseService;
use crate::models::{Project, StimulusDocument, VersionedState};
use crate::services::error::StateServiceError;
use crate::services::permission_service::PermissionService;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Versioned store for per-project stimulus documents
#[derive(Debug, Clone)]
pub struct StateService {
    db: DatabaseService,
    permissions: PermissionService,

    /// Serializes the read-compare-write sequence of `put_state`
    write_lock: Arc<Mutex<()>>,
}

impl StateService {
    pub fn new(db: DatabaseService, permissions: PermissionService) -> Self {
        Self {
            db,
            permissions,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read the current versioned state of a project
    pub async fn get_state(
        &self,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<VersionedState, StateServiceError> {
        let project = self.permissions.require_access(user_uid, project_uid).await?;
        let document = decode_document(&project)?;
        Ok(document.state)
    }

    /// Replace a project's state if the submitted version is current
    ///
    /// Returns the stored `VersionedState` after the write (same payload,
    /// version incremented by 1). A stale submission fails with
    /// `VersionConflict` carrying the authoritative state; nothing is
    /// written in that case.
    pub async fn put_state(
        &self,
        user_uid: &str,
        project_uid: &str,
        candidate: VersionedState,
    ) -> Result<VersionedState, StateServiceError> {
        // Lock before the authoritative read; releasing between read and
        // write would let two writers both pass the version check.
        let _guard = self.write_lock.lock().await;

        let project = self.permissions.require_access(user_uid, project_uid).await?;

        // Access resolves first; validation failures are only disclosed
        // to requesters allowed to write
        candidate.state.validate()?;

        let mut document = decode_document(&project)?;

        if candidate.version != document.state.version {
            warn!(
                project_uid,
                submitted = candidate.version,
                stored = document.state.version,
                "rejecting stale write"
            );
            return Err(StateServiceError::version_conflict(
                candidate.version,
                document.state.version,
                document.state,
            ));
        }

        let accepted = VersionedState::new(candidate.state, document.state.version + 1);
        document.state = accepted.clone();

        let blob = encode_document(project_uid, &document)?;
        self.db.db_update_stimulus(project.id, &blob).await?;

        debug!(project_uid, version = accepted.version, "state written");
        Ok(accepted)
    }

    /// Read the full stimulus document (reference lists included)
    pub async fn get_document(
        &self,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<StimulusDocument, StateServiceError> {
        let project = self.permissions.require_access(user_uid, project_uid).await?;
        decode_document(&project)
    }

    /// Repair a corrupt stimulus blob by reseeding it
    ///
    /// Admin-only escape hatch; the old blob is lost.
    pub async fn reseed_state(
        &self,
        acting_uid: &str,
        project_uid: &str,
        root_content: &str,
    ) -> Result<VersionedState, StateServiceError> {
        self.permissions.require_admin(acting_uid).await?;

        let _guard = self.write_lock.lock().await;

        let project = self
            .db
            .db_get_project_by_uid(project_uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(project_uid))?;

        let document = StimulusDocument::seeded(root_content);
        let blob = encode_document(project_uid, &document)?;
        self.db.db_update_stimulus(project.id, &blob).await?;

        info!(project_uid, "stimulus document reseeded");
        Ok(document.state)
    }
}

pub(crate) fn decode_document(project: &Project) -> Result<StimulusDocument, StateServiceError> {
    serde_json::from_str(&project.stimulus)
        .map_err(|e| StateServiceError::corrupt_document(&project.uid, e.to_string()))
}

pub(crate) fn encode_document(
    project_uid: &str,
    document: &StimulusDocument,
) -> Result<String, StateServiceError> {
    serde_json::to_string(document)
        .map_err(|e| StateServiceError::corrupt_document(project_uid, e.to_string()))
}

#[cfg(test)]
#[path = "state_service_test.rs"]
mod state_service_test;
