//! Mind map tree model.
//!
//! Trees arrive as JSON from the mind map service (or a local file) and are
//! treated as read-only snapshots afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Free-form annotations attached to a node.
///
/// The service sends either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    One(String),
    Many(Vec<String>),
}

impl Details {
    /// Detail entries in order. A single string is a one-element slice.
    pub fn entries(&self) -> &[String] {
        match self {
            Self::One(text) => std::slice::from_ref(text),
            Self::Many(items) => items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// One element of a mind map tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within a tree. Empty means "no tree yet".
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            children: Vec::new(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    /// Detail entries, empty when the node has none.
    ///
    /// An explicitly empty list behaves exactly like an absent one.
    pub fn detail_entries(&self) -> &[String] {
        self.details.as_ref().map_or(&[], Details::entries)
    }

    pub fn has_details(&self) -> bool {
        !self.detail_entries().is_empty()
    }

    /// Whether this tree has anything worth drawing.
    pub fn is_renderable(&self) -> bool {
        !self.id.is_empty() && !self.children.is_empty()
    }

    /// Depth-first search returning a reference into this tree.
    pub fn find(&self, id: &str) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Total number of nodes in the tree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Total number of detail entries in the tree.
    pub fn detail_count(&self) -> usize {
        self.detail_entries().len() + self.children.iter().map(Self::detail_count).sum::<usize>()
    }
}

/// Parse a tree from JSON text.
///
/// # Errors
///
/// Returns an error if the text is not a valid tree document.
pub fn parse_tree(json: &str) -> serde_json::Result<Node> {
    serde_json::from_str(json)
}

/// Load a tree from a JSON file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid tree.
pub fn load_tree_file(path: &Path) -> anyhow::Result<Node> {
    use anyhow::Context;

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree {}", path.display()))?;
    parse_tree(&text).with_context(|| format!("Invalid tree JSON in {}", path.display()))
}
