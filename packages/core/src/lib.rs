//! Stimmap Core Business Logic Layer
//!
//! This crate provides the data model, storage, and service orchestration
//! for the Stimmap collaborative mind-mapping system.
//!
//! # Architecture
//!
//! - **Opaque documents**: each project stores one serialized stimulus
//!   document; reads and writes move it whole
//! - **Optimistic concurrency**: an integer version guards every write;
//!   stale writes are rejected with the authoritative state attached
//! - **libsql/Turso**: embedded SQLite-compatible database
//!
//! # Modules
//!
//! - [`models`] - Data structures (StimulusDocument, User, Project, etc.)
//! - [`services`] - Business services (StateService, PermissionService, etc.)
//! - [`db`] - Database layer with libsql integration

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService};
pub use models::*;
pub use services::*;
