//! Business Services
//!
//! This module contains the core business logic services:
//!
//! - `PermissionService` - access resolution and grant administration
//! - `StateService` - versioned stimulus reads/writes under optimistic
//!   concurrency control
//! - `ProjectService` - project lifecycle and document seeding
//!
//! Services coordinate between the database layer and application logic,
//! implementing business rules and orchestrating complex operations.

pub mod error;
pub mod permission_service;
pub mod project_service;
pub mod state_service;

pub use error::StateServiceError;
pub use permission_service::PermissionService;
pub use project_service::{CreateProjectRequest, ProjectService, StimulusLink, StimulusSeed};
pub use state_service::StateService;
