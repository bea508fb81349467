//! Import/export orchestration
//!
//! Resolves a plugin (explicit id, alias, or detection), delegates to it and converts between
//! text and bytes for files, downloads and the clipboard. Unlike the registry, every lookup
//! failure here is an error naming the format that could not be found.

use crate::common::slug::slugify;
use crate::detect::{Confidence, Detection};
use crate::error::ServiceError;
use crate::format::{ExportOutput, FormatPlugin, ImportResult, SourceFile, SourceInput};
use crate::node::ExportInput;
use crate::registry::FormatRegistry;
use crate::validation::ValidationResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const OCTET_STREAM: &str = "application/octet-stream";
const PLAIN_TEXT: &str = "text/plain";

/// System clipboard seam
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ServiceError>;
}

/// Clipboard that keeps the last write in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|contents| contents.clone())
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ServiceError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| ServiceError::Clipboard("clipboard lock poisoned".to_string()))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

/// Exported bytes plus the MIME type to serve them with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub struct IoService<'r> {
    registry: &'r FormatRegistry,
}

impl<'r> IoService<'r> {
    pub fn new(registry: &'r FormatRegistry) -> Self {
        IoService { registry }
    }

    pub fn registry(&self) -> &'r FormatRegistry {
        self.registry
    }

    fn plugin(&self, format_id: &str) -> Result<&'r dyn FormatPlugin, ServiceError> {
        self.registry
            .get(format_id)
            .ok_or_else(|| ServiceError::FormatNotFound {
                format_id: format_id.to_string(),
            })
    }

    fn plugin_for_file(
        &self,
        file: &SourceFile,
        format_id: Option<&str>,
    ) -> Result<&'r dyn FormatPlugin, ServiceError> {
        match format_id {
            Some(format_id) => self.plugin(format_id),
            None => self
                .registry
                .detect_format(file)
                .ok_or_else(|| ServiceError::UndetectableFormat {
                    name: file.name.clone(),
                }),
        }
    }

    /// Which plugin would handle `file`, and how sure the choice is.
    ///
    /// The confidence is the chosen plugin's own sniffer score; a choice made from the file
    /// name alone, where the sniffer abstains, counts as certain.
    pub fn detect(&self, file: &SourceFile) -> Result<Detection, ServiceError> {
        let plugin = self.plugin_for_file(file, None)?;
        let confidence = plugin
            .detector()
            .and_then(|detect| detect(&file.text_lossy()))
            .unwrap_or(Confidence::CERTAIN);
        Ok(Detection {
            format_id: plugin.format_id().to_string(),
            confidence,
        })
    }

    pub fn import_source(
        &self,
        file: &SourceFile,
        format_id: Option<&str>,
    ) -> Result<ImportResult, ServiceError> {
        let plugin = self.plugin_for_file(file, format_id)?;
        debug!(file = %file.name, format = plugin.format_id(), "importing");
        let result = plugin.import(SourceInput::File(file))?;
        info!(
            file = %file.name,
            format = plugin.format_id(),
            nodes = result.nodes.len(),
            warnings = result.warnings.len(),
            "imported"
        );
        Ok(result)
    }

    /// Read a file from disk and import it.
    pub async fn import_file(
        &self,
        path: impl AsRef<Path>,
        format_id: Option<&str>,
    ) -> Result<ImportResult, ServiceError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file = SourceFile::new(path.to_string_lossy(), bytes);
        self.import_source(&file, format_id)
    }

    pub fn import_string(
        &self,
        text: &str,
        format_id: &str,
        source_path: Option<&str>,
    ) -> Result<ImportResult, ServiceError> {
        let plugin = self.plugin(format_id)?;
        let input = match source_path {
            Some(path) => SourceInput::text_at(text, path),
            None => SourceInput::text(text),
        };
        Ok(plugin.import(input)?)
    }

    pub fn validate(
        &self,
        file: &SourceFile,
        format_id: Option<&str>,
    ) -> Result<ValidationResult, ServiceError> {
        let plugin = self.plugin_for_file(file, format_id)?;
        Ok(plugin.validate(SourceInput::File(file)))
    }

    pub fn export(&self, input: &ExportInput, format_id: &str) -> Result<ExportOutput, ServiceError> {
        let plugin = self.plugin(format_id)?;
        Ok(plugin.export(input)?)
    }

    /// Export as text; binary formats are an error here.
    pub fn export_to_string(&self, input: &ExportInput, format_id: &str) -> Result<String, ServiceError> {
        match self.export(input, format_id)? {
            ExportOutput::Text(text) => Ok(text),
            ExportOutput::Binary(_) => Err(ServiceError::BinaryOutput {
                format_id: self.registry.resolve_format(format_id).to_string(),
            }),
        }
    }

    pub fn export_to_blob(&self, input: &ExportInput, format_id: &str) -> Result<Blob, ServiceError> {
        let plugin = self.plugin(format_id)?;
        let output = plugin.export(input)?;
        let fallback = match output {
            ExportOutput::Text(_) => PLAIN_TEXT,
            ExportOutput::Binary(_) => OCTET_STREAM,
        };
        Ok(Blob {
            mime_type: plugin.mime_types().first().copied().unwrap_or(fallback).to_string(),
            bytes: output.into_bytes(),
        })
    }

    /// Export into `dir`, named after the content with the format's primary extension.
    pub async fn download(
        &self,
        input: &ExportInput,
        format_id: &str,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, ServiceError> {
        let plugin = self.plugin(format_id)?;
        let blob = self.export_to_blob(input, format_id)?;

        let stem = Some(slugify(&input.title))
            .filter(|stem| !stem.is_empty())
            .or_else(|| input.id.as_deref().map(slugify).filter(|stem| !stem.is_empty()))
            .unwrap_or_else(|| "export".to_string());
        let extension = plugin.file_extensions().first().copied().unwrap_or(".txt");
        let dir = dir.as_ref();
        let path = dir.join(format!("{stem}{extension}"));

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, &blob.bytes).await?;
        info!(path = %path.display(), bytes = blob.bytes.len(), "downloaded");
        Ok(path)
    }

    pub async fn copy_to_clipboard(
        &self,
        clipboard: &dyn Clipboard,
        input: &ExportInput,
        format_id: &str,
    ) -> Result<(), ServiceError> {
        let text = self.export_to_string(input, format_id)?;
        clipboard.write_text(&text).await
    }
}
