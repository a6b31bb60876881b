//! Database Connection Management
//!
//! This module provides the database connection, schema initialization, and
//! the row-level queries backing Stimmap's services, using libsql/Turso.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: enabled; permission rows cascade with their user and
//!   project rows
//! - **Opaque document storage**: the stimulus document is one TEXT column
//!   on the project row, read and replaced whole
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions** to avoid
//! SQLite thread-safety violations when the Tokio runtime moves futures
//! between threads. The 5-second busy timeout lets concurrent operations
//! wait and retry instead of failing immediately with `SQLITE_BUSY`.

use crate::db::error::DatabaseError;
use crate::models::{PermissionEntry, Project, ProjectPreview, User, UserType};
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Parse timestamp from database - handles both SQLite and RFC3339 formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(DatabaseError::sql_execution(format!(
        "Unable to parse timestamp '{}'",
        s
    )))
}

/// Database service for managing libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use stimmap_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = DatabaseService::new(PathBuf::from("./data/stimmap.db")).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// Ensures the parent directory exists, opens/creates the database file,
    /// and initializes the schema (idempotent, CREATE TABLE IF NOT EXISTS).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute(). This helper encapsulates that pattern.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `users`: external uid, contact fields, role column
    /// - `projects`: external uid, metadata, the serialized stimulus document
    /// - `permissions`: (user_id, project_id) grant rows, cascade on delete
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        // Wait up to 5s instead of failing immediately on lock
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        // Enable foreign key constraints
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL UNIQUE,
                email TEXT,
                first_name TEXT,
                last_name TEXT,
                user_type TEXT NOT NULL DEFAULT 'regular'
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create users table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                uid TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                definition TEXT,
                owner_id INTEGER,
                date_created DATETIME DEFAULT CURRENT_TIMESTAMP,
                stimulus TEXT NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE SET NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create projects table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS permissions (
                user_id INTEGER NOT NULL,
                project_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, project_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create permissions table: {}", e))
        })?;

        // The admin permissions screen looks grants up by project
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_permissions_project ON permissions(project_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_permissions_project': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only use this in synchronous, single-threaded contexts. In async
    /// functions use `connect_with_timeout()` instead.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    ///
    /// The safe default for all async contexts: a 5-second busy timeout so
    /// concurrent operations wait and retry instead of failing when the
    /// database is locked.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    //
    // USER QUERIES
    //

    /// Insert a user row, returning its internal id
    pub async fn db_create_user(
        &self,
        uid: &str,
        email: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        user_type: UserType,
    ) -> Result<i64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO users (uid, email, first_name, last_name, user_type)
             VALUES (?, ?, ?, ?, ?)",
            (uid, email, first_name, last_name, user_type.as_column()),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert user: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Look up a user by external uid
    pub async fn db_get_user_by_uid(&self, uid: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, uid, email, first_name, last_name, user_type
                 FROM users WHERE uid = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare user query: {}", e))
            })?;

        let mut rows = stmt.query([uid]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute user query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
        let user_type: String = row
            .get(5)
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
        Ok(User {
            id: row
                .get(0)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            uid: row
                .get(1)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            email: row
                .get(2)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            first_name: row
                .get(3)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            last_name: row
                .get(4)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
            user_type: UserType::from_column(&user_type),
        })
    }

    //
    // PROJECT QUERIES
    //

    /// Insert a project row, returning its internal id
    pub async fn db_create_project(
        &self,
        uid: &str,
        title: &str,
        description: Option<&str>,
        definition: Option<&str>,
        owner_id: Option<i64>,
        stimulus: &str,
    ) -> Result<i64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO projects (uid, title, description, definition, owner_id, stimulus)
             VALUES (?, ?, ?, ?, ?, ?)",
            (uid, title, description, definition, owner_id, stimulus),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert project: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }

    /// Look up a project by external uid (includes the stimulus blob)
    pub async fn db_get_project_by_uid(
        &self,
        uid: &str,
    ) -> Result<Option<Project>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, uid, title, description, definition, owner_id, date_created, stimulus
                 FROM projects WHERE uid = ?",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare project query: {}", e))
            })?;

        let mut rows = stmt.query([uid]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute project query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => {
                let date_raw: String = row
                    .get(6)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
                Ok(Some(Project {
                    id: row
                        .get(0)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    uid: row
                        .get(1)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    title: row
                        .get(2)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    description: row
                        .get(3)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    definition: row
                        .get(4)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    owner_id: row
                        .get(5)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                    date_created: parse_timestamp(&date_raw)?,
                    stimulus: row
                        .get(7)
                        .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Replace a project's stimulus blob
    ///
    /// Returns the number of rows affected (0 = project vanished).
    pub async fn db_update_stimulus(
        &self,
        project_id: i64,
        stimulus: &str,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "UPDATE projects SET stimulus = ? WHERE id = ?",
            (stimulus, project_id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to update stimulus: {}", e)))
    }

    /// Delete a project by internal id
    ///
    /// Permission rows cascade via foreign keys. Returns rows affected
    /// (0 = project didn't exist).
    pub async fn db_delete_project(&self, project_id: i64) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute("DELETE FROM projects WHERE id = ?", [project_id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete project: {}", e)))
    }

    /// List every project (admin view)
    pub async fn db_list_projects_all(&self) -> Result<Vec<ProjectPreview>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT uid, title, description, date_created
                 FROM projects ORDER BY date_created",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare previews query: {}", e))
            })?;

        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute previews query: {}", e))
        })?;

        Self::collect_previews(&mut rows).await
    }

    /// List projects the given user has permission rows for
    pub async fn db_list_projects_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<ProjectPreview>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT p.uid, p.title, p.description, p.date_created
                 FROM projects p
                 JOIN permissions per ON per.project_id = p.id
                 WHERE per.user_id = ?
                 ORDER BY p.date_created",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare previews query: {}", e))
            })?;

        let mut rows = stmt.query([user_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute previews query: {}", e))
        })?;

        Self::collect_previews(&mut rows).await
    }

    async fn collect_previews(
        rows: &mut libsql::Rows,
    ) -> Result<Vec<ProjectPreview>, DatabaseError> {
        let mut previews = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let date_raw: String = row
                .get(3)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            previews.push(ProjectPreview {
                uid: row
                    .get(0)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                title: row
                    .get(1)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                description: row
                    .get(2)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                date_created: parse_timestamp(&date_raw)?,
            });
        }
        Ok(previews)
    }

    //
    // PERMISSION QUERIES
    //

    /// Check for a (user, project) grant row
    pub async fn db_has_permission(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<bool, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT 1 FROM permissions WHERE user_id = ? AND project_id = ?")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare permission query: {}", e))
            })?;

        let mut rows = stmt.query((user_id, project_id)).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute permission query: {}", e))
        })?;

        Ok(rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .is_some())
    }

    /// Insert a grant row (idempotent via INSERT OR IGNORE)
    pub async fn db_grant_permission(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "INSERT OR IGNORE INTO permissions (user_id, project_id) VALUES (?, ?)",
            (user_id, project_id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to grant permission: {}", e)))?;

        Ok(())
    }

    /// Remove a grant row; returns rows affected (0 = no such grant)
    pub async fn db_revoke_permission(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<u64, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM permissions WHERE user_id = ? AND project_id = ?",
            (user_id, project_id),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to revoke permission: {}", e)))
    }

    /// List every user with a has-permission flag for the given project
    ///
    /// Admins are flagged true regardless of grant rows, matching the
    /// implicit-access rule in the permission resolver.
    pub async fn db_list_users_with_permission(
        &self,
        project_id: i64,
    ) -> Result<Vec<PermissionEntry>, DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT u.uid, u.email, u.first_name, u.last_name, u.user_type,
                        per.user_id IS NOT NULL AS granted
                 FROM users u
                 LEFT JOIN permissions per
                   ON per.user_id = u.id AND per.project_id = ?
                 ORDER BY u.id",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare permission listing query: {}",
                    e
                ))
            })?;

        let mut rows = stmt.query([project_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to execute permission listing query: {}",
                e
            ))
        })?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let user_type_raw: String = row
                .get(4)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            let user_type = UserType::from_column(&user_type_raw);
            let granted: i64 = row
                .get(5)
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?;
            entries.push(PermissionEntry {
                uid: row
                    .get(0)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                email: row
                    .get(1)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                first_name: row
                    .get(2)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                last_name: row
                    .get(3)
                    .map_err(|e| DatabaseError::sql_execution(e.to_string()))?,
                user_type,
                has_permission: granted != 0 || user_type.is_admin(),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
#[path = "database_test.rs"]
mod database_test;
