//! Data Models
//!
//! This module contains the core data structures used throughout Stimmap:
//!
//! - `StimulusDocument` / `MapState` / `StateItem` - the mind-map payload
//!   and the versioned envelope the synchronization protocol exchanges
//! - `User` / `Project` - account and project records backing the
//!   permission model

mod account;
mod state;

pub use account::{PermissionEntry, Project, ProjectPreview, User, UserType};
pub use state::{MapState, StateItem, StateValidationError, StimulusDocument, VersionedState};
