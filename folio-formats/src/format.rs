//! Format plugin contract
//!
//! This module defines the [`FormatPlugin`] trait that every content format implements, plus
//! the input and output shapes that flow through it. A plugin bundles identity (id, extensions,
//! MIME types), capability flags, import, export, validation, an optional sniffer and the
//! editor/renderer handles the UI layer asks for.

use crate::detect::DetectFn;
use crate::error::FormatError;
use crate::node::{ContentNode, ExportInput};
use crate::validation::{ValidationResult, ValidationWarning};
use serde::Serialize;
use std::borrow::Cow;
use std::path::Path;

/// Raw file handed to a plugin: name, optional MIME type, bytes
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        SourceFile {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Lossy text view, good enough for sniffing binary signatures too.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Every dotted suffix of the file name, longest first and lowercased
    ///
    /// `notes/q1.perseus.json` yields `[".perseus.json", ".json"]`.
    pub fn extension_suffixes(&self) -> Vec<String> {
        let file_name = Path::new(&self.name)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.name)
            .to_lowercase();

        file_name
            .char_indices()
            .filter(|(idx, ch)| *ch == '.' && *idx > 0)
            .map(|(idx, _)| file_name[idx..].to_string())
            .collect()
    }
}

/// What a plugin imports or validates
#[derive(Debug, Clone, Copy)]
pub enum SourceInput<'a> {
    Text {
        text: &'a str,
        source_path: Option<&'a str>,
    },
    File(&'a SourceFile),
}

impl<'a> SourceInput<'a> {
    pub fn text(text: &'a str) -> Self {
        SourceInput::Text {
            text,
            source_path: None,
        }
    }

    pub fn text_at(text: &'a str, source_path: &'a str) -> Self {
        SourceInput::Text {
            text,
            source_path: Some(source_path),
        }
    }

    pub fn source_path(&self) -> Option<&'a str> {
        match self {
            SourceInput::Text { source_path, .. } => *source_path,
            SourceInput::File(file) => Some(file.name.as_str()),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        match self {
            SourceInput::Text { text, .. } => text.as_bytes(),
            SourceInput::File(file) => &file.bytes,
        }
    }

    /// Text content; files must be UTF-8.
    pub fn as_text(&self) -> Result<&'a str, FormatError> {
        match self {
            SourceInput::Text { text, .. } => Ok(text),
            SourceInput::File(file) => std::str::from_utf8(&file.bytes).map_err(|e| {
                FormatError::ParseError(format!("'{}' is not valid UTF-8: {e}", file.name))
            }),
        }
    }
}

/// Nodes produced by an import, plus non-fatal findings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub nodes: Vec<ContentNode>,
    pub warnings: Vec<ValidationWarning>,
}

impl ImportResult {
    pub fn single(node: ContentNode) -> Self {
        ImportResult {
            nodes: vec![node],
            warnings: Vec::new(),
        }
    }

    /// The first node; for multi-node formats this is the container (e.g. the Feature).
    pub fn primary(&self) -> Option<&ContentNode> {
        self.nodes.first()
    }
}

/// Serialized output produced by a [`FormatPlugin`] export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutput {
    /// UTF-8 text output (markdown, gherkin, JSON)
    Text(String),
    /// Binary output (archives)
    Binary(Vec<u8>),
}

impl ExportOutput {
    /// Consume the serialized output and return the underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ExportOutput::Text(text) => text.into_bytes(),
            ExportOutput::Binary(bytes) => bytes,
        }
    }
}

/// What a plugin can do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub import: bool,
    pub export: bool,
    pub validate: bool,
    pub render: bool,
    pub edit: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        import: true,
        export: true,
        validate: true,
        render: true,
        edit: true,
    };
}

/// Opaque reference to a UI component owned by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentHandle(Cow<'static, str>);

impl ComponentHandle {
    pub const fn from_static(name: &'static str) -> Self {
        ComponentHandle(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        ComponentHandle(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    /// Plain source text
    #[default]
    Code,
    /// Form over structured fields
    Form,
    /// Replace by uploading a file
    Upload,
}

/// How the UI should set up an editor for a format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub mode: EditorMode,
    pub language: Option<String>,
    pub show_preview: bool,
    pub word_wrap: bool,
}

/// Static description of a plugin for discovery UIs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatMetadata {
    pub format_id: String,
    pub display_name: String,
    pub description: String,
    pub file_extensions: Vec<String>,
    pub mime_types: Vec<String>,
    pub supports_round_trip: bool,
    pub priority: i32,
    pub capabilities: Capabilities,
}

/// Trait for content formats
///
/// Implementors provide import (source → nodes), export (node fields → source) and validation
/// for one format. Only identity and capabilities are mandatory; everything else defaults to
/// "not supported" so a partial plugin stays honest about what it can do.
///
/// # Examples
///
/// ```ignore
/// struct PlainText;
///
/// impl FormatPlugin for PlainText {
///     fn format_id(&self) -> &str {
///         "plaintext"
///     }
///
///     fn display_name(&self) -> &str {
///         "Plain text"
///     }
///
///     fn capabilities(&self) -> Capabilities {
///         Capabilities { import: true, ..Default::default() }
///     }
///
///     fn import(&self, input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
///         todo!()
///     }
/// }
/// ```
pub trait FormatPlugin: Send + Sync {
    /// Unique registry key (e.g. "markdown", "gherkin")
    fn format_id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Extensions with their leading dot (e.g. [".md", ".markdown"])
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    fn mime_types(&self) -> &[&str] {
        &[]
    }

    fn capabilities(&self) -> Capabilities;

    /// Ordering hint when several formats match the same input
    fn priority(&self) -> i32 {
        0
    }

    fn supports_round_trip(&self) -> bool {
        false
    }

    /// Parse source into nodes
    ///
    /// Fails only when the input cannot be read as this format at all; ambiguities become
    /// warnings on the result.
    fn import(&self, _input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support import",
            self.format_id()
        )))
    }

    /// Serialize node fields back into source
    ///
    /// Same input, same output; the only time-dependent field is `input.updated_at`.
    fn export(&self, _input: &ExportInput) -> Result<ExportOutput, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not support export",
            self.format_id()
        )))
    }

    /// Structural checks; never fails, always reports.
    fn validate(&self, _input: SourceInput<'_>) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.error(
            "NOT_SUPPORTED",
            format!("Format '{}' does not support validation", self.format_id()),
            None,
        );
        result
    }

    /// Confidence sniffer, absent when the format cannot be recognised from text
    fn detector(&self) -> Option<DetectFn> {
        None
    }

    /// Render node content to HTML for previews
    fn render_html(&self, _node: &ContentNode) -> Result<String, FormatError> {
        Err(FormatError::NotSupported(format!(
            "Format '{}' does not render to HTML",
            self.format_id()
        )))
    }

    fn renderer_component(&self) -> Option<ComponentHandle> {
        None
    }

    /// Specialized editor; `None` means the registry's default editor applies.
    fn editor_component(&self) -> Option<ComponentHandle> {
        None
    }

    fn editor_config(&self) -> Option<EditorConfig> {
        None
    }

    fn format_metadata(&self) -> FormatMetadata {
        FormatMetadata {
            format_id: self.format_id().to_string(),
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
            file_extensions: self.file_extensions().iter().map(|s| s.to_string()).collect(),
            mime_types: self.mime_types().iter().map(|s| s.to_string()).collect(),
            supports_round_trip: self.supports_round_trip(),
            priority: self.priority(),
            capabilities: self.capabilities(),
        }
    }
}

/// Run `import` after a successful validation and keep the first node as a preview.
///
/// Import failures are swallowed: the preview is best-effort.
pub fn attach_preview<P: FormatPlugin + ?Sized>(
    plugin: &P,
    input: SourceInput<'_>,
    result: &mut ValidationResult,
) {
    if !result.is_valid() {
        return;
    }
    if let Ok(imported) = plugin.import(input) {
        result.parsed_preview = imported.nodes.into_iter().next();
    }
}
