//! Database Layer
//!
//! This module handles all database interactions using libsql (embedded
//! SQLite):
//!
//! - Database initialization and idempotent schema creation
//! - Row-level queries for users, projects, and permission grants
//! - Whole-document storage of the serialized stimulus blob
//!
//! Business rules (access decisions, version comparison) live one layer up
//! in `crate::services`; this layer only moves typed rows in and out.

mod database;
mod error;

pub use database::DatabaseService;
pub use error::DatabaseError;
