//! Tests for project creation, seeding, deletion, and listings.

use super::*;
use crate::models::UserType;
use crate::services::state_service::StateService;
use tempfile::TempDir;

struct Fixture {
    service: ProjectService,
    states: StateService,
    permissions: PermissionService,
    db: DatabaseService,
    _dir: TempDir,
}

async fn create_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let db = DatabaseService::new(dir.path().join("test.db"))
        .await
        .unwrap();
    let permissions = PermissionService::new(db.clone());
    Fixture {
        service: ProjectService::new(db.clone(), permissions.clone()),
        states: StateService::new(db.clone(), permissions.clone()),
        permissions,
        db,
        _dir: dir,
    }
}

fn seed(content: &str) -> StimulusSeed {
    StimulusSeed {
        content: content.to_string(),
        description: None,
        link: None,
    }
}

fn basic_request() -> CreateProjectRequest {
    CreateProjectRequest {
        title: "Noise study".to_string(),
        description: Some("desc".to_string()),
        definition: None,
        problem_statement: seed("How to reduce office noise?"),
        init_stimulus: vec![seed("white noise"), seed("partitions")],
        related_stimulus: vec![seed("acoustics paper")],
        unrelated_stimulus: vec![seed("coffee machine")],
    }
}

#[tokio::test]
async fn create_seeds_a_valid_version_zero_document() {
    let f = create_fixture().await;
    f.db.db_create_user("admin", None, None, None, UserType::Admin)
        .await
        .unwrap();

    let preview = f
        .service
        .create_project("admin", basic_request())
        .await
        .unwrap();
    assert_eq!(preview.title, "Noise study");

    let state = f.states.get_state("admin", &preview.uid).await.unwrap();
    assert_eq!(state.version, 0);
    assert!(state.state.validate().is_ok());
    assert_eq!(state.state.root_item_key, "root");

    let root = state.state.item("root").unwrap();
    assert_eq!(root.content, "How to reduce office noise?");
    assert_eq!(root.sub_item_keys, vec!["init1", "init2"]);
    assert_eq!(state.state.item("init1").unwrap().content, "white noise");

    let doc = f.states.get_document("admin", &preview.uid).await.unwrap();
    assert_eq!(doc.related.len(), 1);
    assert_eq!(doc.unrelated.len(), 1);
}

#[tokio::test]
async fn link_is_folded_into_the_description() {
    let f = create_fixture().await;
    f.db.db_create_user("admin", None, None, None, UserType::Admin)
        .await
        .unwrap();

    let mut req = basic_request();
    req.init_stimulus = vec![StimulusSeed {
        content: "paper".to_string(),
        description: Some("see".to_string()),
        link: Some(StimulusLink {
            href: "http://example.com".to_string(),
            href_name: "source".to_string(),
        }),
    }];

    let preview = f.service.create_project("admin", req).await.unwrap();
    let state = f.states.get_state("admin", &preview.uid).await.unwrap();
    assert_eq!(
        state.state.item("init1").unwrap().desc.as_deref(),
        Some("see source: (http://example.com)")
    );
}

#[tokio::test]
async fn create_and_delete_are_admin_only() {
    let f = create_fixture().await;
    f.db.db_create_user("u-1", None, None, None, UserType::Regular)
        .await
        .unwrap();

    assert!(matches!(
        f.service.create_project("u-1", basic_request()).await,
        Err(StateServiceError::AccessDenied)
    ));
    assert!(matches!(
        f.service.delete_project("u-1", "whatever").await,
        Err(StateServiceError::AccessDenied)
    ));
}

#[tokio::test]
async fn delete_removes_the_project() {
    let f = create_fixture().await;
    f.db.db_create_user("admin", None, None, None, UserType::Admin)
        .await
        .unwrap();

    let preview = f
        .service
        .create_project("admin", basic_request())
        .await
        .unwrap();
    f.service
        .delete_project("admin", &preview.uid)
        .await
        .unwrap();

    assert!(matches!(
        f.states.get_state("admin", &preview.uid).await,
        Err(StateServiceError::ProjectNotFound { .. })
    ));
    assert!(matches!(
        f.service.delete_project("admin", &preview.uid).await,
        Err(StateServiceError::ProjectNotFound { .. })
    ));
}

#[tokio::test]
async fn listings_are_scoped_by_role() {
    let f = create_fixture().await;
    f.db.db_create_user("admin", None, None, None, UserType::Admin)
        .await
        .unwrap();
    f.db.db_create_user("u-1", None, None, None, UserType::Regular)
        .await
        .unwrap();

    let p1 = f
        .service
        .create_project("admin", basic_request())
        .await
        .unwrap();
    f.service
        .create_project("admin", basic_request())
        .await
        .unwrap();
    f.permissions
        .grant_permission("admin", "u-1", &p1.uid)
        .await
        .unwrap();

    assert_eq!(f.service.list_previews("admin").await.unwrap().len(), 2);
    let mine = f.service.list_previews("u-1").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].uid, p1.uid);

    assert!(matches!(
        f.service.list_previews("ghost").await,
        Err(StateServiceError::AccessDenied)
    ));
}
