//! Stimulus Document Data Structures
//!
//! This module defines the mind-map payload attached to each project and the
//! versioned envelope the synchronization protocol exchanges.
//!
//! # Architecture
//!
//! - **Flat tree encoding**: the mind map is an ordered list of items keyed
//!   by string, with parent/child edges stored on both sides
//! - **Versioned envelope**: `VersionedState` pairs a payload with the
//!   integer optimistic-concurrency token
//! - **Opaque storage**: the whole `StimulusDocument` is serialized into a
//!   single TEXT column on the project row; no partial updates
//!
//! # Examples
//!
//! ```rust
//! use stimmap_core::models::{MapState, StateItem};
//!
//! let root = StateItem::root("root", "Problem statement");
//! let state = MapState::new("root", vec![root]);
//! assert!(state.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for mind-map payloads
#[derive(Error, Debug)]
pub enum StateValidationError {
    #[error("Duplicate item key: {0}")]
    DuplicateKey(String),

    #[error("Item '{item}' references unknown parent '{parent}'")]
    UnknownParent { item: String, parent: String },

    #[error("Item '{item}' lists unknown child '{child}'")]
    UnknownChild { item: String, child: String },

    #[error("Item '{child}' is listed as a child of '{parent}' but its parentKey is {actual:?}")]
    EdgeMismatch {
        parent: String,
        child: String,
        actual: Option<String>,
    },

    #[error("Expected exactly one root item, found {0}")]
    RootCount(usize),

    #[error("rootItemKey '{0}' does not match the parentless item")]
    RootKeyMismatch(String),

    #[error("editorRootItemKey '{0}' does not refer to an existing item")]
    UnknownEditorRoot(String),
}

/// One node in the mind-map tree.
///
/// Keys are opaque unique strings; `parent_key` is `None` only for the root.
/// `collapse` is UI-only expand/collapse state and carries no server-side
/// meaning, but it round-trips through storage untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateItem {
    /// Unique identifier within the payload
    pub key: String,

    /// Parent item key; `None` only for the root item
    pub parent_key: Option<String>,

    /// Ordered child keys
    #[serde(default)]
    pub sub_item_keys: Vec<String>,

    /// Display text
    pub content: String,

    /// Optional description/annotation
    #[serde(default)]
    pub desc: Option<String>,

    /// UI expand/collapse state
    #[serde(default)]
    pub collapse: bool,
}

impl StateItem {
    /// Create a root item (no parent, no children yet)
    pub fn root(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            parent_key: None,
            sub_item_keys: Vec::new(),
            content: content.into(),
            desc: None,
            collapse: false,
        }
    }

    /// Create a child item under the given parent
    pub fn child(
        key: impl Into<String>,
        parent_key: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            parent_key: Some(parent_key.into()),
            sub_item_keys: Vec::new(),
            content: content.into(),
            desc: None,
            collapse: false,
        }
    }

    /// Set the description, builder style
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

/// The editable mind-map payload (`state.state` in the stored document).
///
/// `editor_root_item_key` may differ from `root_item_key` when the user has
/// zoomed the editing viewport into a subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapState {
    /// Key of the tree's logical root
    pub root_item_key: String,

    /// Key of the node currently used as the editing viewport root
    pub editor_root_item_key: String,

    /// Flat item list encoding the tree
    pub items: Vec<StateItem>,
}

impl MapState {
    /// Create a payload whose viewport root equals the logical root
    pub fn new(root_item_key: impl Into<String>, items: Vec<StateItem>) -> Self {
        let root_item_key = root_item_key.into();
        Self {
            editor_root_item_key: root_item_key.clone(),
            root_item_key,
            items,
        }
    }

    /// Look up an item by key
    pub fn item(&self, key: &str) -> Option<&StateItem> {
        self.items.iter().find(|i| i.key == key)
    }

    /// Validate the tree invariants
    ///
    /// Checks that:
    /// - every key is unique
    /// - every `parent_key` (except the root's) refers to an existing item
    /// - parent/child edges are mutually consistent
    /// - exactly one item is parentless and its key equals `root_item_key`
    /// - `editor_root_item_key` refers to an existing item
    pub fn validate(&self) -> Result<(), StateValidationError> {
        let mut keys: HashSet<&str> = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !keys.insert(item.key.as_str()) {
                return Err(StateValidationError::DuplicateKey(item.key.clone()));
            }
        }

        let mut roots = 0usize;
        for item in &self.items {
            match &item.parent_key {
                None => roots += 1,
                Some(parent) => {
                    if !keys.contains(parent.as_str()) {
                        return Err(StateValidationError::UnknownParent {
                            item: item.key.clone(),
                            parent: parent.clone(),
                        });
                    }
                }
            }

            for child_key in &item.sub_item_keys {
                let child = self.item(child_key).ok_or_else(|| {
                    StateValidationError::UnknownChild {
                        item: item.key.clone(),
                        child: child_key.clone(),
                    }
                })?;
                if child.parent_key.as_deref() != Some(item.key.as_str()) {
                    return Err(StateValidationError::EdgeMismatch {
                        parent: item.key.clone(),
                        child: child_key.clone(),
                        actual: child.parent_key.clone(),
                    });
                }
            }
        }

        if roots != 1 {
            return Err(StateValidationError::RootCount(roots));
        }

        let root = self
            .items
            .iter()
            .find(|i| i.parent_key.is_none())
            .ok_or(StateValidationError::RootCount(0))?;
        if root.key != self.root_item_key {
            return Err(StateValidationError::RootKeyMismatch(
                self.root_item_key.clone(),
            ));
        }

        if !keys.contains(self.editor_root_item_key.as_str()) {
            return Err(StateValidationError::UnknownEditorRoot(
                self.editor_root_item_key.clone(),
            ));
        }

        Ok(())
    }
}

/// A mind-map payload tagged with its optimistic-concurrency version.
///
/// This is the unit the wire protocol exchanges: read responses, write
/// requests, write confirmations, and conflict bodies are all a
/// `VersionedState`. The version is the sole concurrency token - no
/// timestamps or hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedState {
    /// The mind-map payload
    pub state: MapState,

    /// Incremented by exactly 1 on every accepted write; starts at 0
    pub version: i64,
}

impl VersionedState {
    /// Wrap a payload at the given version
    pub fn new(state: MapState, version: i64) -> Self {
        Self { state, version }
    }
}

/// The full stimulus document stored per project.
///
/// `related` / `unrelated` are auxiliary reference lists outside the
/// editable tree; the synchronization protocol reads the blob whole and
/// writes it back whole, leaving them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StimulusDocument {
    /// Versioned editable state
    pub state: VersionedState,

    /// Reference stimulus items judged related to the problem
    #[serde(default)]
    pub related: Vec<StateItem>,

    /// Reference stimulus items judged unrelated
    #[serde(default)]
    pub unrelated: Vec<StateItem>,
}

impl StimulusDocument {
    /// Create an empty document at version 0 with a bare root item
    pub fn seeded(root_content: impl Into<String>) -> Self {
        let root = StateItem::root("root", root_content);
        Self {
            state: VersionedState::new(MapState::new("root", vec![root]), 0),
            related: Vec::new(),
            unrelated: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;
