//! Tests for the stimulus document payload and its tree invariants.

use super::*;
use serde_json::json;

fn two_level_state() -> MapState {
    let mut root = StateItem::root("root", "Problem");
    root.sub_item_keys = vec!["a".to_string(), "b".to_string()];
    let a = StateItem::child("a", "root", "First idea").with_desc("note");
    let b = StateItem::child("b", "root", "Second idea");
    MapState::new("root", vec![root, a, b])
}

#[test]
fn validate_accepts_well_formed_tree() {
    assert!(two_level_state().validate().is_ok());
}

#[test]
fn validate_rejects_duplicate_keys() {
    let mut state = two_level_state();
    state.items.push(StateItem::child("a", "root", "dup"));

    assert!(matches!(
        state.validate(),
        Err(StateValidationError::DuplicateKey(k)) if k == "a"
    ));
}

#[test]
fn validate_rejects_dangling_parent() {
    let mut state = two_level_state();
    state.items.push(StateItem::child("c", "ghost", "orphan"));

    assert!(matches!(
        state.validate(),
        Err(StateValidationError::UnknownParent { .. })
    ));
}

#[test]
fn validate_rejects_one_sided_edge() {
    let mut state = two_level_state();
    // Root claims "c" as a child but "c" points at "a"
    state.items[0].sub_item_keys.push("c".to_string());
    state.items.push(StateItem::child("c", "a", "misfiled"));

    assert!(matches!(
        state.validate(),
        Err(StateValidationError::EdgeMismatch { .. })
    ));
}

#[test]
fn validate_rejects_multiple_roots() {
    let mut state = two_level_state();
    state.items.push(StateItem::root("other", "Second root"));

    assert!(matches!(
        state.validate(),
        Err(StateValidationError::RootCount(2))
    ));
}

#[test]
fn validate_rejects_mismatched_root_key() {
    let mut state = two_level_state();
    state.root_item_key = "a".to_string();

    // "a" has a parent, so the parentless item no longer matches rootItemKey
    assert!(state.validate().is_err());
}

#[test]
fn validate_rejects_unknown_editor_root() {
    let mut state = two_level_state();
    state.editor_root_item_key = "ghost".to_string();

    assert!(matches!(
        state.validate(),
        Err(StateValidationError::UnknownEditorRoot(_))
    ));
}

#[test]
fn editor_root_may_be_a_subtree() {
    let mut state = two_level_state();
    state.editor_root_item_key = "a".to_string();

    assert!(state.validate().is_ok());
}

#[test]
fn payload_round_trips_through_json() {
    let state = two_level_state();
    let encoded = serde_json::to_string(&state).unwrap();
    let decoded: MapState = serde_json::from_str(&encoded).unwrap();

    assert_eq!(state, decoded);
}

#[test]
fn payload_uses_legacy_wire_names() {
    let state = two_level_state();
    let value = serde_json::to_value(&state).unwrap();

    assert!(value.get("rootItemKey").is_some());
    assert!(value.get("editorRootItemKey").is_some());
    let item = &value["items"][1];
    assert_eq!(item["parentKey"], json!("root"));
    assert!(item.get("subItemKeys").is_some());
}

#[test]
fn item_decode_tolerates_missing_optional_fields() {
    // Legacy clients omit collapse/desc/subItemKeys on leaf items
    let item: StateItem =
        serde_json::from_value(json!({"key": "x", "parentKey": "root", "content": "leaf"}))
            .unwrap();

    assert!(!item.collapse);
    assert!(item.desc.is_none());
    assert!(item.sub_item_keys.is_empty());
}

#[test]
fn unicode_content_survives_round_trip() {
    let mut state = two_level_state();
    state.items[1].content = "アイデア — идея".to_string();

    let encoded = serde_json::to_string(&state).unwrap();
    let decoded: MapState = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.item("a").unwrap().content, "アイデア — идея");
}

#[test]
fn seeded_document_starts_at_version_zero() {
    let doc = StimulusDocument::seeded("Problem statement");

    assert_eq!(doc.state.version, 0);
    assert_eq!(doc.state.state.root_item_key, "root");
    assert_eq!(doc.state.state.editor_root_item_key, "root");
    assert!(doc.state.state.validate().is_ok());
    assert!(doc.related.is_empty());
    assert!(doc.unrelated.is_empty());
}

#[test]
fn document_round_trips_with_reference_lists() {
    let mut doc = StimulusDocument::seeded("Problem");
    doc.related
        .push(StateItem::root("r1", "related stimulus").with_desc("source: (http://x)"));
    doc.unrelated.push(StateItem::root("u1", "unrelated"));

    let encoded = serde_json::to_string(&doc).unwrap();
    let decoded: StimulusDocument = serde_json::from_str(&encoded).unwrap();
    assert_eq!(doc, decoded);
}
