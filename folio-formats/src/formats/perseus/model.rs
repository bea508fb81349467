//! Perseus item model
//!
//! Only the fields this crate inspects are typed; everything else rides along in `extra` so
//! export never drops data the widget renderer needs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `[[☃ numeric-input 1]]` → `numeric-input 1`
static WIDGET_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[☃ ([A-Za-z0-9_-]+ \d+)\]\]").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded: Option<bool>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Markdown-ish content plus the widgets and images it references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub images: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub widgets: BTreeMap<String, Widget>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Renderable {
    /// Widget keys referenced by placeholders, in order of appearance
    pub fn placeholders(&self) -> Vec<&str> {
        WIDGET_PLACEHOLDER_RE
            .captures_iter(&self.content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Content with placeholders removed and whitespace flattened
    pub fn plain_text(&self) -> String {
        let stripped = WIDGET_PLACEHOLDER_RE.replace_all(&self.content, " ");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDataVersion {
    pub major: u32,
    pub minor: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerseusItem {
    pub question: Renderable,
    #[serde(default)]
    pub hints: Vec<Renderable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_area: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_data_version: Option<ItemDataVersion>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PerseusItem {
    pub fn title(&self) -> Option<&str> {
        self.extra
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

/// A file holds one item or a list of items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizDocument {
    Items(Vec<PerseusItem>),
    Item(Box<PerseusItem>),
}

impl QuizDocument {
    pub fn items(&self) -> &[PerseusItem] {
        match self {
            QuizDocument::Items(items) => items,
            QuizDocument::Item(item) => std::slice::from_ref(item.as_ref()),
        }
    }
}
