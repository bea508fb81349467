//! Packaged HTML5 apps
//!
//! A `.zip` holding a self-contained web app. Import keeps the archive intact: the node's
//! structured content carries the base64-encoded bytes alongside the resolved entry point and
//! the file list, so export can hand back exactly what came in.
//!
//! Structured content shape:
//!
//! ```json
//! { "entryPoint": "index.html", "files": ["index.html", "app.js"], "archive": "UEsDB..." }
//! ```
//!
//! For export, `files` may instead be an object of `name → text` pairs, which is zipped up.

pub mod archive;

use crate::common::slug::{file_stem, slugify, title_from_path};
use crate::detect::{Confidence, DetectFn};
use crate::error::FormatError;
use crate::format::{
    attach_preview, Capabilities, ComponentHandle, EditorConfig, EditorMode, ExportOutput,
    FormatPlugin, ImportResult, SourceInput,
};
use crate::node::{ContentNode, ExportInput, NodeContent};
use crate::validation::{ValidationResult, ValidationWarning};
use archive::{inspect, is_zip, AppArchive, MANIFEST_FILE};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

pub const FORMAT_ID: &str = "html5-app";

const UNTITLED: &str = "Untitled App";

#[derive(Debug, Clone, Copy, Default)]
pub struct Html5AppFormat;

fn detect_zip(text: &str) -> Option<Confidence> {
    if is_zip(text.as_bytes()) {
        Confidence::new(0.9)
    } else {
        None
    }
}

fn export_archive(content: &Value) -> Result<Vec<u8>, FormatError> {
    if let Some(encoded) = content.get("archive").and_then(Value::as_str) {
        return STANDARD
            .decode(encoded)
            .map_err(|err| FormatError::SerializationError(format!("archive is not valid base64: {err}")));
    }
    match content.get("files") {
        Some(Value::Object(files)) => {
            let mut entries = Vec::with_capacity(files.len());
            for (name, body) in files {
                let body = body.as_str().ok_or_else(|| {
                    FormatError::SerializationError(format!("file '{name}' must be a string"))
                })?;
                entries.push((name.as_str(), body.as_bytes()));
            }
            archive::build(entries)
        }
        _ => Err(FormatError::SerializationError(
            "html5-app content needs an 'archive' or a 'files' object".to_string(),
        )),
    }
}

impl FormatPlugin for Html5AppFormat {
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "HTML5 App"
    }

    fn description(&self) -> &str {
        "Zipped interactive web applications"
    }

    fn file_extensions(&self) -> &[&str] {
        &[".zip"]
    }

    fn mime_types(&self) -> &[&str] {
        &["application/zip"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            import: true,
            export: true,
            validate: true,
            render: false,
            edit: true,
        }
    }

    fn supports_round_trip(&self) -> bool {
        true
    }

    fn import(&self, input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
        let bytes = input.bytes();
        let app = inspect(bytes)?;
        if let Some(entry) = app.unsafe_entries().next() {
            return Err(FormatError::ParseError(format!(
                "archive entry '{}' escapes the archive root",
                entry.name
            )));
        }

        let source_path = input.source_path();
        let id = source_path
            .map(|path| slugify(file_stem(path)))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "app".to_string());
        let manifest = app.manifest.as_ref();
        let title = manifest
            .and_then(|m| m.display_name())
            .map(str::to_string)
            .or_else(|| source_path.map(title_from_path))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        let files: Vec<&str> = app.files().map(|entry| entry.name.as_str()).collect();

        let mut node = ContentNode::new(id, "html5-app");
        node.title = title;
        node.description = manifest
            .and_then(|m| m.description.clone())
            .unwrap_or_default();
        node.content = NodeContent::Structured(json!({
            "entryPoint": app.entry_point,
            "files": files,
            "archive": STANDARD.encode(bytes),
        }));
        node.content_format = FORMAT_ID.to_string();
        node.source_path = source_path.map(str::to_string);
        node.metadata.insert("entryPoint".into(), json!(app.entry_point));
        node.metadata.insert("fileCount".into(), json!(files.len()));
        node.metadata.insert("totalBytes".into(), json!(app.total_size()));

        let mut warnings = Vec::new();
        if app.entry_point.is_none() {
            warnings.push(
                ValidationWarning::new("MISSING_ENTRY_POINT", "no index.html or manifest entryPoint found")
                    .with_suggestion("Add index.html at the archive root"),
            );
        }
        Ok(ImportResult {
            nodes: vec![node],
            warnings,
        })
    }

    fn export(&self, input: &ExportInput) -> Result<ExportOutput, FormatError> {
        match &input.content {
            NodeContent::Structured(content) => export_archive(content).map(ExportOutput::Binary),
            NodeContent::Text(_) => Err(FormatError::SerializationError(
                "html5-app export needs structured content".to_string(),
            )),
        }
    }

    fn validate(&self, input: SourceInput<'_>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let app: AppArchive = match inspect(input.bytes()) {
            Ok(app) => app,
            Err(err) => {
                result.error("INVALID_ARCHIVE", err.to_string(), None);
                return result;
            }
        };

        for entry in app.unsafe_entries() {
            result.error(
                "UNSAFE_PATH",
                format!("entry '{}' escapes the archive root", entry.name),
                None,
            );
        }
        if app.entry_point.is_none() {
            result.error("MISSING_ENTRY_POINT", "no index.html or manifest entryPoint found", None);
        }
        if let Some(declared) = &app.dangling_entry_point {
            result.warn(ValidationWarning::new(
                "DANGLING_ENTRY_POINT",
                format!("manifest entryPoint '{declared}' is not in the archive"),
            ));
        }
        match (&app.manifest, &app.manifest_error) {
            (_, Some(err)) => result.warn(ValidationWarning::new(
                "INVALID_MANIFEST",
                format!("{MANIFEST_FILE} could not be read: {err}"),
            )),
            (None, None) => result.warn(
                ValidationWarning::new("MISSING_MANIFEST", format!("archive has no {MANIFEST_FILE}"))
                    .with_suggestion("Add a manifest with name and entryPoint"),
            ),
            _ => {}
        }

        result.stat("files", app.files().count());
        result.stat("bytes", usize::try_from(app.total_size()).unwrap_or(usize::MAX));

        attach_preview(self, input, &mut result);
        result
    }

    fn detector(&self) -> Option<DetectFn> {
        Some(detect_zip)
    }

    fn renderer_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("html5-app-frame"))
    }

    fn editor_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("html5-app-uploader"))
    }

    fn editor_config(&self) -> Option<EditorConfig> {
        Some(EditorConfig {
            mode: EditorMode::Upload,
            language: None,
            show_preview: true,
            word_wrap: false,
        })
    }
}
