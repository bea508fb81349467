//! Canonical content representation
//!
//! Every plugin imports into [`ContentNode`]s and exports from an [`ExportInput`], so the rest
//! of the system never has to know which source syntax a piece of content came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Body of a node: raw source text or a structured value.
///
/// Never coerced implicitly; consumers match on both arms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NodeContent {
    Text(String),
    Structured(Value),
}

impl NodeContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeContent::Text(text) => Some(text),
            NodeContent::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            NodeContent::Text(_) => None,
            NodeContent::Structured(value) => Some(value),
        }
    }
}

impl Default for NodeContent {
    fn default() -> Self {
        NodeContent::Text(String::new())
    }
}

/// One piece of content, independent of its source format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: String,
    /// epic, feature, scenario, quiz, concept, ...
    pub content_type: String,
    pub title: String,
    pub description: String,
    pub content: NodeContent,
    pub content_format: String,
    pub tags: BTreeSet<String>,
    /// May contain duplicates when several relationship kinds point at the same node.
    pub related_node_ids: Vec<String>,
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

impl ContentNode {
    pub fn new(id: impl Into<String>, content_type: impl Into<String>) -> Self {
        ContentNode {
            id: id.into(),
            content_type: content_type.into(),
            ..Default::default()
        }
    }

    pub fn is_related_to(&self, id: &str) -> bool {
        self.related_node_ids.iter().any(|related| related == id)
    }
}

/// The exportable fields of a node; also the snapshot a draft edits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub content: NodeContent,
    pub content_type: String,
    pub content_format: String,
    pub tags: Vec<String>,
    pub related_node_ids: Vec<String>,
    pub metadata: Map<String, Value>,
    /// Stamped by the caller; plugins that carry metadata write it verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExportInput {
    /// Shallow merge: every field present in the patch replaces the current value.
    pub fn apply(&mut self, patch: ExportPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(content_type) = patch.content_type {
            self.content_type = content_type;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(related) = patch.related_node_ids {
            self.related_node_ids = related;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
    }
}

impl From<&ContentNode> for ExportInput {
    fn from(node: &ContentNode) -> Self {
        ExportInput {
            id: Some(node.id.clone()),
            title: node.title.clone(),
            description: node.description.clone(),
            content: node.content.clone(),
            content_type: node.content_type.clone(),
            content_format: node.content_format.clone(),
            tags: node.tags.iter().cloned().collect(),
            related_node_ids: node.related_node_ids.clone(),
            metadata: node.metadata.clone(),
            updated_at: None,
        }
    }
}

/// Partial update for an [`ExportInput`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<NodeContent>,
    pub content_type: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_node_ids: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl ExportPatch {
    pub fn title(title: impl Into<String>) -> Self {
        ExportPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: NodeContent) -> Self {
        ExportPatch {
            content: Some(content),
            ..Default::default()
        }
    }
}
