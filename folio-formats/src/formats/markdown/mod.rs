//! Markdown format implementation
//!
//! Imports Markdown documents into a single content node, exports node fields back to Markdown
//! and renders previews as HTML.
//!
//! # Library Choice
//!
//! Import is a hand-written line parser (see [`parser`]) because nodes need frontmatter,
//! heading anchors and `[Feature: ...]` references rather than a full CommonMark tree.
//! HTML previews go through the `comrak` crate, which gives us CommonMark plus the GFM
//! extensions authors expect (tables, strikethrough, task lists).
//!
//! # Node Mapping
//!
//! | Markdown                         | Node field                                  |
//! |----------------------------------|---------------------------------------------|
//! | first `# Heading`                | `title` (frontmatter `title`, then file name) |
//! | first section (or paragraph), two sentences | `description` (frontmatter `description` wins) |
//! | frontmatter `tags` + `@word`     | `tags`                                      |
//! | `feature:`/`epic:` tags, `related` | `relatedNodeIds`                          |
//! | file name                        | `id` (slugified)                            |
//! | whole text                       | `content` (text)                            |
//! | sections, anchors, references    | `metadata.sections`                         |
//!
//! # Lossy Conversions
//!
//! - Frontmatter is regenerated on export; comments and quoting inside it are lost.
//! - Values containing commas are read back as lists.

pub mod parser;
pub mod serializer;

pub use parser::CategoryRules;

use crate::detect::{Confidence, DetectFn, Signals};
use crate::error::FormatError;
use crate::format::{
    attach_preview, Capabilities, ComponentHandle, EditorConfig, EditorMode, ExportOutput,
    FormatPlugin, ImportResult, SourceInput,
};
use crate::node::{ContentNode, ExportInput, NodeContent};
use crate::validation::{ValidationResult, ValidationWarning};
use comrak::{markdown_to_html, ComrakOptions};
use once_cell::sync::Lazy;
use parser::{heading, is_fence, parse_frontmatter, parse_markdown, FrontmatterValue, FRONTMATTER_DELIMITER};
use regex::Regex;
use serde_json::{json, Map, Value};

pub const FORMAT_ID: &str = "markdown";

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]\n]+\]\([^)\s]+\)").expect("valid regex"));
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*[^*\n]+\*\*|__[^_\n]+__|(?:^|\s)\*[^*\s][^*\n]*\*").expect("valid regex")
});
static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:[-*+]|\d+\.)\s+\S").expect("valid regex"));

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    categories: CategoryRules,
}

impl MarkdownFormat {
    pub fn with_categories(categories: CategoryRules) -> Self {
        MarkdownFormat { categories }
    }
}

fn detect_markdown(text: &str) -> Option<Confidence> {
    let lines: Vec<&str> = text.lines().collect();
    Signals::new()
        .add(parse_frontmatter(&lines).is_some(), 0.3)
        .add(
            lines
                .iter()
                .any(|line| heading(line).is_some_and(|(_, title)| !title.is_empty())),
            0.3,
        )
        .add(LINK_RE.is_match(text), 0.2)
        .add(EMPHASIS_RE.is_match(text), 0.1)
        .add(LIST_RE.is_match(text), 0.1)
        .finish()
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.front_matter_delimiter = Some(FRONTMATTER_DELIMITER.to_string());
    options
}

impl FormatPlugin for MarkdownFormat {
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "Markdown"
    }

    fn description(&self) -> &str {
        "Markdown documents with key: value frontmatter"
    }

    fn file_extensions(&self) -> &[&str] {
        &[".md", ".markdown"]
    }

    fn mime_types(&self) -> &[&str] {
        &["text/markdown"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn supports_round_trip(&self) -> bool {
        true
    }

    fn import(&self, input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
        let text = input.as_text()?;
        let parsed = parse_markdown(text, input.source_path(), &self.categories);

        let mut warnings = Vec::new();
        if text.lines().next().map(str::trim_end) == Some(FRONTMATTER_DELIMITER) && parsed.body_start == 0 {
            warnings.push(
                ValidationWarning::new("UNCLOSED_FRONTMATTER", "frontmatter has no closing delimiter; read as body text")
                    .with_suggestion("Close the block with a '---' line"),
            );
        }
        if !parsed.sections.iter().any(|section| section.level == 1) {
            warnings.push(ValidationWarning::new(
                "MISSING_TITLE",
                format!("no level-1 heading; title derived as '{}'", parsed.title),
            ));
        }

        let content_type = ["type", "contentType"]
            .iter()
            .find_map(|key| parsed.frontmatter.get(*key).and_then(FrontmatterValue::as_scalar))
            .filter(|value| !value.is_empty())
            .unwrap_or("concept")
            .to_string();

        let mut metadata = Map::new();
        metadata.insert("category".into(), json!(parsed.category));
        metadata.insert("wordCount".into(), json!(parsed.word_count));
        metadata.insert("sections".into(), serde_json::to_value(&parsed.sections).unwrap_or(Value::Null));
        metadata.insert("featureIds".into(), json!(parsed.feature_ids));
        metadata.insert("epicIds".into(), json!(parsed.epic_ids));
        if !parsed.frontmatter.is_empty() {
            metadata.insert(
                "frontmatter".into(),
                serde_json::to_value(&parsed.frontmatter).unwrap_or(Value::Null),
            );
        }

        let node = ContentNode {
            id: parsed.id,
            content_type,
            title: parsed.title,
            description: parsed.description,
            content: NodeContent::Text(text.to_string()),
            content_format: FORMAT_ID.to_string(),
            tags: parsed.tags,
            related_node_ids: parsed.related_ids,
            metadata,
            source_path: input.source_path().map(str::to_string),
        };

        Ok(ImportResult {
            nodes: vec![node],
            warnings,
        })
    }

    fn export(&self, input: &ExportInput) -> Result<ExportOutput, FormatError> {
        serializer::serialize_to_markdown(input).map(ExportOutput::Text)
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
        if text.trim().is_empty() {
            result.error("EMPTY_CONTENT", "document is empty", None);
            return result;
        }

        let lines: Vec<&str> = text.lines().collect();
        let body_start = if lines[0].trim_end() == FRONTMATTER_DELIMITER {
            match parse_frontmatter(&lines) {
                Some((_, start)) => {
                    for (idx, line) in lines[1..start - 1].iter().enumerate() {
                        if !line.trim().is_empty() && !line.contains(':') {
                            result.warn(
                                ValidationWarning::new(
                                    "MALFORMED_FRONTMATTER_LINE",
                                    format!("line {} is not a key: value pair", idx + 2),
                                )
                                .with_suggestion("Use 'key: value'"),
                            );
                        }
                    }
                    start
                }
                None => {
                    result.error("UNCLOSED_FRONTMATTER", "frontmatter block is never closed", Some(1));
                    0
                }
            }
        } else {
            0
        };

        let mut open_fence: Option<usize> = None;
        let mut previous_level: Option<usize> = None;
        let mut titles = 0;
        let mut sections = 0;
        for (idx, line) in lines.iter().enumerate().skip(body_start) {
            if is_fence(line) {
                open_fence = match open_fence {
                    Some(_) => None,
                    None => Some(idx + 1),
                };
                continue;
            }
            if open_fence.is_some() {
                continue;
            }
            let Some((level, title)) = heading(line) else {
                continue;
            };
            sections += 1;
            if level == 1 {
                titles += 1;
            }
            if title.is_empty() {
                result.warn(ValidationWarning::new(
                    "EMPTY_HEADING",
                    format!("heading on line {} has no text", idx + 1),
                ));
            }
            if let Some(previous) = previous_level {
                if level > previous + 1 {
                    result.warn(
                        ValidationWarning::new(
                            "HEADING_LEVEL_SKIP",
                            format!("line {}: heading jumps from level {previous} to {level}", idx + 1),
                        )
                        .with_suggestion(format!("Use a level {} heading", previous + 1)),
                    );
                }
            }
            previous_level = Some(level);
        }
        if let Some(line) = open_fence {
            result.error("UNCLOSED_CODE_BLOCK", "code fence is never closed", Some(line));
        }
        match titles {
            0 => result.warn(
                ValidationWarning::new("MISSING_TITLE", "document has no level-1 heading")
                    .with_suggestion("Start the document with '# Title'"),
            ),
            1 => {}
            _ => result.warn(ValidationWarning::new(
                "MULTIPLE_TITLES",
                "document has more than one level-1 heading",
            )),
        }

        result.stat("words", crate::common::text::word_count(text));
        result.stat("lines", lines.len());
        result.stat("sections", sections);

        attach_preview(self, input, &mut result);
        result
    }

    fn detector(&self) -> Option<DetectFn> {
        Some(detect_markdown)
    }

    fn render_html(&self, node: &ContentNode) -> Result<String, FormatError> {
        match &node.content {
            NodeContent::Text(text) => Ok(markdown_to_html(text, &default_comrak_options())),
            NodeContent::Structured(_) => Err(FormatError::NotSupported(
                "markdown rendering needs text content".to_string(),
            )),
        }
    }

    fn renderer_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("markdown-renderer"))
    }

    fn editor_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("markdown-editor"))
    }

    fn editor_config(&self) -> Option<EditorConfig> {
        Some(EditorConfig {
            mode: EditorMode::Code,
            language: Some(FORMAT_ID.to_string()),
            show_preview: true,
            word_wrap: true,
        })
    }
}
