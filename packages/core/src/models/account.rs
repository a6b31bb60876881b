//! User and Project Records
//!
//! Users carry an external UID plus an internal numeric id; the `UserType`
//! enum replaces the legacy stringly-typed `"admin"` tag with a closed
//! variant set so permission checks match exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role attached to a user account.
///
/// Admins pass every permission check implicitly; regular users need an
/// explicit permission row per project. Unknown legacy column values decode
/// as `Regular` so a typo in old data can never grant admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Regular,
}

impl UserType {
    /// Decode the database TEXT column
    pub fn from_column(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            _ => Self::Regular,
        }
    }

    /// Encode for the database TEXT column
    pub fn as_column(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Regular => "regular",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// A user account.
///
/// `id` is the internal numeric primary key (used by permission rows);
/// `uid` is the externally visible identifier carried in bearer tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing)]
    pub id: i64,
    pub uid: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: UserType,
}

/// A research project row.
///
/// Owns exactly one stimulus document, stored serialized in `stimulus`.
/// `uid` is the opaque externally visible identifier; `id` the internal
/// primary key referenced by permission rows.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub description: Option<String>,
    pub definition: Option<String>,
    pub owner_id: Option<i64>,
    pub date_created: DateTime<Utc>,
    /// Serialized `StimulusDocument` blob
    pub stimulus: String,
}

/// Project listing entry, filtered by the requester's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPreview {
    pub uid: String,
    pub title: String,
    pub description: Option<String>,
    pub date_created: DateTime<Utc>,
}

/// One row of the admin permissions screen: a user plus whether they can
/// access the project in question (admins always can).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub uid: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: UserType,
    pub has_permission: bool,
}
