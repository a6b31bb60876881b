//! Project Lifecycle
//!
//! Creation, deletion, and listing of projects. Creation seeds the stimulus
//! document: a "root" item holding the problem statement, one "init1".."initN"
//! child per initial stimulus, and the related/unrelated reference lists.

use crate::db::DatabaseService;
use crate::models::{MapState, ProjectPreview, StateItem, StimulusDocument, VersionedState};
use crate::services::error::StateServiceError;
use crate::services::permission_service::PermissionService;
use crate::services::state_service::encode_document;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// External link attached to a seeded stimulus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusLink {
    pub href: String,
    pub href_name: String,
}

/// One stimulus supplied at project creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusSeed {
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<StimulusLink>,
}

impl StimulusSeed {
    /// Fold the optional link into the description, "name: (href)" style
    fn desc(&self) -> Option<String> {
        match (&self.description, &self.link) {
            (None, None) => None,
            (Some(d), None) => Some(d.clone()),
            (d, Some(link)) => Some(format!(
                "{} {}: ({})",
                d.as_deref().unwrap_or_default(),
                link.href_name,
                link.href
            )),
        }
    }

    fn into_item(self, key: impl Into<String>, parent_key: Option<&str>) -> StateItem {
        let desc = self.desc();
        let mut item = match parent_key {
            Some(parent) => StateItem::child(key, parent, self.content),
            None => StateItem::root(key, self.content),
        };
        item.desc = desc;
        item
    }
}

/// Payload for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    pub problem_statement: StimulusSeed,
    #[serde(default)]
    pub init_stimulus: Vec<StimulusSeed>,
    #[serde(default)]
    pub related_stimulus: Vec<StimulusSeed>,
    #[serde(default)]
    pub unrelated_stimulus: Vec<StimulusSeed>,
}

/// Manages project rows and their seeded stimulus documents
#[derive(Debug, Clone)]
pub struct ProjectService {
    db: DatabaseService,
    permissions: PermissionService,
}

impl ProjectService {
    pub fn new(db: DatabaseService, permissions: PermissionService) -> Self {
        Self { db, permissions }
    }

    /// Create a project with a freshly seeded document (admin-only)
    ///
    /// Returns the new project's preview; its generated uid is the handle
    /// for every other operation.
    pub async fn create_project(
        &self,
        acting_uid: &str,
        req: CreateProjectRequest,
    ) -> Result<ProjectPreview, StateServiceError> {
        let owner = self.permissions.require_admin(acting_uid).await?;

        let uid = Uuid::new_v4().to_string();
        let document = seed_document(&req);
        let blob = encode_document(&uid, &document)?;

        self.db
            .db_create_project(
                &uid,
                &req.title,
                req.description.as_deref(),
                req.definition.as_deref(),
                Some(owner.id),
                &blob,
            )
            .await?;

        info!(project_uid = %uid, title = %req.title, "project created");

        let project = self
            .db
            .db_get_project_by_uid(&uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(&uid))?;
        Ok(ProjectPreview {
            uid: project.uid,
            title: project.title,
            description: project.description,
            date_created: project.date_created,
        })
    }

    /// Delete a project and its grant rows (admin-only)
    pub async fn delete_project(
        &self,
        acting_uid: &str,
        project_uid: &str,
    ) -> Result<(), StateServiceError> {
        self.permissions.require_admin(acting_uid).await?;

        let project = self
            .db
            .db_get_project_by_uid(project_uid)
            .await?
            .ok_or_else(|| StateServiceError::project_not_found(project_uid))?;

        self.db.db_delete_project(project.id).await?;
        info!(project_uid, "project deleted");
        Ok(())
    }

    /// List project previews visible to a user
    ///
    /// Admins see every project; regular users see the ones they hold a
    /// grant for. Unknown users are denied.
    pub async fn list_previews(
        &self,
        user_uid: &str,
    ) -> Result<Vec<ProjectPreview>, StateServiceError> {
        let user = self
            .db
            .db_get_user_by_uid(user_uid)
            .await?
            .ok_or(StateServiceError::AccessDenied)?;

        if user.user_type.is_admin() {
            Ok(self.db.db_list_projects_all().await?)
        } else {
            Ok(self.db.db_list_projects_for_user(user.id).await?)
        }
    }
}

/// Build the version-0 document from the creation payload
fn seed_document(req: &CreateProjectRequest) -> StimulusDocument {
    let mut root = req
        .problem_statement
        .clone()
        .into_item("root", None);

    let mut items = Vec::with_capacity(req.init_stimulus.len() + 1);
    for (i, seed) in req.init_stimulus.iter().enumerate() {
        let key = format!("init{}", i + 1);
        root.sub_item_keys.push(key.clone());
        items.push(seed.clone().into_item(key, Some("root")));
    }
    items.push(root);

    StimulusDocument {
        state: VersionedState::new(MapState::new("root", items), 0),
        related: req
            .related_stimulus
            .iter()
            .enumerate()
            .map(|(i, s)| s.clone().into_item(format!("rel{}", i + 1), None))
            .collect(),
        unrelated: req
            .unrelated_stimulus
            .iter()
            .enumerate()
            .map(|(i, s)| s.clone().into_item(format!("unrel{}", i + 1), None))
            .collect(),
    }
}

#[cfg(test)]
#[path = "project_service_test.rs"]
mod project_service_test;
