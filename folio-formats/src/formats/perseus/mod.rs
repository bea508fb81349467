//! Perseus quiz format
//!
//! Structured assessment items (question content, interactive widgets, hints). Items import
//! as a single `quiz` node whose content is the JSON value itself; rendering the widgets is
//! the job of an external renderer, so this plugin only checks structure.
//!
//! Earlier content used several ids for the same format. They are registered as aliases of
//! [`FORMAT_ID`] (see [`LEGACY_ALIASES`]).

pub mod model;

pub use model::{PerseusItem, QuizDocument, Renderable, Widget};

use crate::common::slug::{file_stem, slugify, title_from_path};
use crate::common::text::summarize;
use crate::detect::{Confidence, DetectFn, Signals};
use crate::error::FormatError;
use crate::format::{
    attach_preview, Capabilities, ComponentHandle, EditorConfig, EditorMode, ExportOutput,
    FormatPlugin, ImportResult, SourceInput,
};
use crate::node::{ContentNode, ExportInput, NodeContent};
use crate::validation::{ValidationResult, ValidationWarning};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub const FORMAT_ID: &str = "perseus";

/// Ids older content uses for this format
pub const LEGACY_ALIASES: [&str; 3] = ["perseus-quiz-json", "perseus-json", "quiz-json"];

const UNTITLED: &str = "Untitled Quiz";

#[derive(Debug, Clone, Copy, Default)]
pub struct PerseusFormat;

fn detect_perseus(text: &str) -> Option<Confidence> {
    let value: Value = serde_json::from_str(text).ok()?;
    let item = match &value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let question = item.get("question");
    Signals::new()
        .add(question.and_then(|q| q.get("content")).is_some(), 0.5)
        .add(question.and_then(|q| q.get("widgets")).is_some(), 0.2)
        .add(item.get("hints").is_some_and(Value::is_array), 0.2)
        .add(
            item.get("answerArea").is_some() || item.get("itemDataVersion").is_some(),
            0.1,
        )
        .finish()
}

fn parse_document(text: &str) -> Result<(Value, QuizDocument), FormatError> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        FormatError::ParseError(format!("invalid JSON at line {}: {err}", err.line()))
    })?;
    let document = serde_json::from_value(value.clone())
        .map_err(|err| FormatError::ParseError(format!("not a Perseus item: {err}")))?;
    Ok((value, document))
}

fn check_item(result: &mut ValidationResult, item: &PerseusItem, label: &str) {
    if item.question.content.trim().is_empty() {
        result.error("MISSING_QUESTION", format!("{label}has no question content"), None);
    }

    let referenced: BTreeSet<&str> = item
        .question
        .placeholders()
        .into_iter()
        .chain(item.hints.iter().flat_map(Renderable::placeholders))
        .collect();
    for key in &referenced {
        let declared = item.question.widgets.contains_key(*key)
            || item.hints.iter().any(|hint| hint.widgets.contains_key(*key));
        if !declared {
            result.error(
                "MISSING_WIDGET",
                format!("{label}placeholder [[☃ {key}]] has no widget definition"),
                None,
            );
        }
    }
    for key in item.question.widgets.keys() {
        if !referenced.contains(key.as_str()) {
            result.warn(
                ValidationWarning::new(
                    "UNUSED_WIDGET",
                    format!("{label}widget '{key}' is never placed in the content"),
                )
                .with_suggestion(format!("Reference it as [[☃ {key}]] or remove it")),
            );
        }
    }
    for (key, widget) in &item.question.widgets {
        if widget.widget_type.trim().is_empty() {
            result.error("INVALID_WIDGET", format!("{label}widget '{key}' has no type"), None);
        }
    }
    if item.hints.is_empty() {
        result.warn(ValidationWarning::new("NO_HINTS", format!("{label}has no hints")));
    }
}

impl FormatPlugin for PerseusFormat {
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "Perseus Quiz"
    }

    fn description(&self) -> &str {
        "Structured quiz items with interactive widgets and hints"
    }

    fn file_extensions(&self) -> &[&str] {
        &[".perseus.json", ".quiz.json"]
    }

    fn mime_types(&self) -> &[&str] {
        &["application/json"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            render: false,
            ..Capabilities::ALL
        }
    }

    fn supports_round_trip(&self) -> bool {
        true
    }

    fn import(&self, input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
        let text = input.as_text()?;
        let (value, document) = parse_document(text)?;
        let items = document.items();
        let source_path = input.source_path();

        let id = source_path
            .map(|path| slugify(file_stem(path)))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "quiz".to_string());
        let title = items
            .iter()
            .find_map(PerseusItem::title)
            .map(str::to_string)
            .or_else(|| source_path.map(title_from_path))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let widget_types: BTreeSet<&str> = items
            .iter()
            .flat_map(|item| item.question.widgets.values())
            .map(|widget| widget.widget_type.as_str())
            .collect();
        let hint_count: usize = items.iter().map(|item| item.hints.len()).sum();

        let mut node = ContentNode::new(id, "quiz");
        node.title = title;
        node.description = items
            .first()
            .map(|item| summarize(&item.question.plain_text(), 2))
            .unwrap_or_default();
        node.content = NodeContent::Structured(value);
        node.content_format = FORMAT_ID.to_string();
        node.tags.insert("quiz".to_string());
        node.source_path = source_path.map(str::to_string);
        node.metadata.insert("itemCount".into(), json!(items.len()));
        node.metadata.insert("widgetTypes".into(), json!(widget_types));
        node.metadata.insert("hintCount".into(), json!(hint_count));

        let mut warnings = Vec::new();
        if items.is_empty() {
            warnings.push(ValidationWarning::new("EMPTY_QUIZ", "quiz has no items"));
        }
        Ok(ImportResult {
            nodes: vec![node],
            warnings,
        })
    }

    fn export(&self, input: &ExportInput) -> Result<ExportOutput, FormatError> {
        let value = match &input.content {
            NodeContent::Structured(value) => value.clone(),
            NodeContent::Text(text) => serde_json::from_str(text).map_err(|err| {
                FormatError::SerializationError(format!("content is not JSON: {err}"))
            })?,
        };
        let mut text = serde_json::to_string_pretty(&value)
            .map_err(|err| FormatError::SerializationError(err.to_string()))?;
        text.push('\n');
        Ok(ExportOutput::Text(text))
    }

    fn validate(&self, input: SourceInput<'_>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let text = match input.as_text() {
            Ok(text) => text,
            Err(err) => {
                result.error("INVALID_ENCODING", err.to_string(), None);
                return result;
            }
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(err) => {
                result.error("INVALID_JSON", err.to_string(), Some(err.line()));
                return result;
            }
        };
        let document: QuizDocument = match serde_json::from_value(value) {
            Ok(document) => document,
            Err(err) => {
                result.error(
                    "INVALID_STRUCTURE",
                    format!("expected a Perseus item or a list of items: {err}"),
                    None,
                );
                return result;
            }
        };

        let items = document.items();
        if items.is_empty() {
            result.error("INVALID_STRUCTURE", "quiz has no items", None);
        }
        for (idx, item) in items.iter().enumerate() {
            let label = if items.len() > 1 {
                format!("item {}: ", idx + 1)
            } else {
                String::new()
            };
            check_item(&mut result, item, &label);
        }

        result.stat("items", items.len());
        result.stat(
            "widgets",
            items.iter().map(|item| item.question.widgets.len()).sum(),
        );
        result.stat("hints", items.iter().map(|item| item.hints.len()).sum());

        attach_preview(self, input, &mut result);
        result
    }

    fn detector(&self) -> Option<DetectFn> {
        Some(detect_perseus)
    }

    fn renderer_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("perseus-renderer"))
    }

    fn editor_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("perseus-editor"))
    }

    fn editor_config(&self) -> Option<EditorConfig> {
        Some(EditorConfig {
            mode: EditorMode::Form,
            language: Some("json".to_string()),
            show_preview: true,
            word_wrap: false,
        })
    }
}
