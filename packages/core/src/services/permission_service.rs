//! Permission Resolution
//!
//! Decides whether a user may touch a project, and manages the grant rows
//! behind that decision.
//!
//! # Access rules
//!
//! Evaluated in order:
//!
//! 1. Unknown user uid: deny
//! 2. Admin user: allow (no grant row needed)
//! 3. Unknown project uid: deny
//! 4. Otherwise: allow iff a (user, project) grant row exists
//!
//! Grant administration (grant, revoke, list) is admin-only.

use crate::db::DatabaseService;
use crate::models::{PermissionEntry, Project, User};
use crate::services::error::StateServiceError;
use tracing::debug;

/// Resolves project access and administers permission grants
#[derive(Debug, Clone)]
pub struct PermissionService {
    db: DatabaseService,
}

impl PermissionService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Can this user access this project?
    ///
    /// Never errors on a denial; `Err` means the lookup itself failed.
    pub async fn can_access(
        &self,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<bool, StateServiceError> {
        let user = match self.db.db_get_user_by_uid(user_uid).await? {
            Some(user) => user,
            None => {
                debug!(user_uid, "access check: unknown user");
                return Ok(false);
            }
        };

        if user.user_type.is_admin() {
            return Ok(true);
        }

        let project = match self.db.db_get_project_by_uid(project_uid).await? {
            Some(project) => project,
            None => {
                debug!(project_uid, "access check: unknown project");
                return Ok(false);
            }
        };

        Ok(self.db.db_has_permission(user.id, project.id).await?)
    }

    /// Resolve the project while enforcing the access rules
    ///
    /// An unknown or unauthorized user is `AccessDenied`. Only admins get
    /// `ProjectNotFound` for a nonexistent uid; to a regular user an
    /// unknown project answers exactly like an ungranted one, so project
    /// uids cannot be enumerated by guessing.
    pub async fn require_access(
        &self,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<Project, StateServiceError> {
        let user = self
            .db
            .db_get_user_by_uid(user_uid)
            .await?
            .ok_or(StateServiceError::AccessDenied)?;

        let project = self.db.db_get_project_by_uid(project_uid).await?;

        if user.user_type.is_admin() {
            return project.ok_or_else(|| StateServiceError::project_not_found(project_uid));
        }

        let project = match project {
            Some(project) => project,
            None => return Err(StateServiceError::AccessDenied),
        };

        if self.db.db_has_permission(user.id, project.id).await? {
            Ok(project)
        } else {
            Err(StateServiceError::AccessDenied)
        }
    }

    /// Resolve a user uid and require the admin role
    pub async fn require_admin(&self, user_uid: &str) -> Result<User, StateServiceError> {
        let user = self
            .db
            .db_get_user_by_uid(user_uid)
            .await?
            .ok_or(StateServiceError::AccessDenied)?;

        if user.user_type.is_admin() {
            Ok(user)
        } else {
            Err(StateServiceError::AccessDenied)
        }
    }

    /// Grant a user access to a project (admin-only, idempotent)
    pub async fn grant_permission(
        &self,
        acting_uid: &str,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<(), StateServiceError> {
        self.require_admin(acting_uid).await?;

        let user = self
            .db
            .db_get_user_by_uid(user_uid)
            .await?
            .ok_or(StateServiceError::AccessDenied)?;
        let project = self
            .db
            .db_get_project_by_uid(project_uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(project_uid))?;

        self.db.db_grant_permission(user.id, project.id).await?;
        debug!(user_uid, project_uid, "permission granted");
        Ok(())
    }

    /// Revoke a user's access to a project (admin-only)
    ///
    /// Revoking a grant that doesn't exist is a no-op.
    pub async fn revoke_permission(
        &self,
        acting_uid: &str,
        user_uid: &str,
        project_uid: &str,
    ) -> Result<(), StateServiceError> {
        self.require_admin(acting_uid).await?;

        let user = self
            .db
            .db_get_user_by_uid(user_uid)
            .await?
            .ok_or(StateServiceError::AccessDenied)?;
        let project = self
            .db
            .db_get_project_by_uid(project_uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(project_uid))?;

        self.db.db_revoke_permission(user.id, project.id).await?;
        debug!(user_uid, project_uid, "permission revoked");
        Ok(())
    }

    /// List every user with a has-permission flag for a project (admin-only)
    pub async fn list_for_project(
        &self,
        acting_uid: &str,
        project_uid: &str,
    ) -> Result<Vec<PermissionEntry>, StateServiceError> {
        self.require_admin(acting_uid).await?;

        let project = self
            .db
            .db_get_project_by_uid(project_uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(project_uid))?;

        Ok(self.db.db_list_users_with_permission(project.id).await?)
    }
}

#[cfg(test)]
#[path = "permission_service_test.rs"]
mod permission_service_test;
