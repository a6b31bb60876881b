//! Wire abstraction for the synchronization protocol
//!
//! The session talks to the server through [`StateTransport`] so the
//! autosave logic can be exercised against an in-memory fake. A save has
//! exactly two non-error outcomes: accepted (with the confirmed version)
//! or rejected with the authoritative state.

use async_trait::async_trait;
use stimmap_core::VersionedState;
use thiserror::Error;

/// Result of a save attempt that reached the server
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The write was applied; carries the stored state (version incremented)
    Accepted(VersionedState),

    /// The submitted version was stale; carries the authoritative state
    Conflict(VersionedState),
}

/// Transport failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// Server rejected the credentials or the access itself
    #[error("Access denied by server")]
    Denied,

    /// Server does not know the project uid
    #[error("Unknown project")]
    InvalidProject,

    /// Request never completed (connection refused, timeout, ...)
    #[error("Network failure: {0}")]
    Network(String),

    /// Response status outside the protocol
    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    /// Response body was not a valid protocol payload
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Reads and writes one project's versioned state
#[async_trait]
pub trait StateTransport: Send + Sync {
    /// Fetch the current authoritative state
    async fn fetch_state(&self) -> Result<VersionedState, TransportError>;

    /// Submit a state based on the version it carries
    ///
    /// Conflicts are an `Ok` outcome, not an error: the request completed
    /// and the server answered with the authoritative state.
    async fn save_state(&self, candidate: &VersionedState) -> Result<SaveOutcome, TransportError>;
}
