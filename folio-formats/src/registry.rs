//! Format registry for format discovery and selection
//!
//! This module provides the registry that every consumer receives by reference. Plugins are
//! indexed by id, by extension and by MIME type; aliases redirect legacy identifiers to a
//! canonical plugin. The maps only change through explicit `register`/`unregister` calls,
//! which are expected during startup. Share the finished registry behind an `Arc`.

use crate::detect::Detection;
use crate::format::{Capabilities, ComponentHandle, EditorConfig, FormatMetadata, FormatPlugin, SourceFile};
use std::collections::HashMap;
use tracing::{debug, warn};

/// How detection resolves equal confidence between candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// First registered wins
    #[default]
    RegistrationOrder,
    /// Higher declared priority wins, then registration order
    Priority,
}

/// Settings fixed when the registry is constructed
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryOptions {
    /// Editor handed out for formats without a specialized one
    pub default_editor: ComponentHandle,
    pub tie_break: TieBreak,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        RegistryOptions {
            default_editor: ComponentHandle::from_static("raw-text-editor"),
            tie_break: TieBreak::RegistrationOrder,
        }
    }
}

/// Registry of format plugins
///
/// # Examples
///
/// ```ignore
/// let mut registry = FormatRegistry::new();
/// registry.register(MarkdownFormat::default());
/// registry.register_alias("md", "markdown");
///
/// let plugin = registry.get("md").expect("alias resolves");
/// let imported = plugin.import(SourceInput::text("# Hello"))?;
/// ```
pub struct FormatRegistry {
    plugins: HashMap<String, Box<dyn FormatPlugin>>,
    /// Registration order; replacing a plugin keeps its slot.
    order: Vec<String>,
    aliases: HashMap<String, String>,
    by_extension: HashMap<String, Vec<String>>,
    by_mime: HashMap<String, Vec<String>>,
    default_editor: ComponentHandle,
    tie_break: TieBreak,
}

fn normalize_extension(extension: &str) -> String {
    let lowered = extension.trim().to_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

fn normalize_mime(mime: &str) -> String {
    mime.trim().to_lowercase()
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        FormatRegistry {
            plugins: HashMap::new(),
            order: Vec::new(),
            aliases: HashMap::new(),
            by_extension: HashMap::new(),
            by_mime: HashMap::new(),
            default_editor: options.default_editor,
            tie_break: options.tie_break,
        }
    }

    /// Register a plugin
    ///
    /// If a plugin with the same id already exists, it will be replaced.
    pub fn register<P: FormatPlugin + 'static>(&mut self, plugin: P) {
        self.register_boxed(Box::new(plugin));
    }

    pub fn register_boxed(&mut self, plugin: Box<dyn FormatPlugin>) {
        let id = plugin.format_id().to_string();
        if let Some(target) = self.aliases.remove(&id) {
            debug!(format = %id, previous = %target, "plugin id replaces alias");
        }

        if self.plugins.contains_key(&id) {
            self.prune_indexes(&id);
            debug!(format = %id, "replacing format plugin");
        } else {
            self.order.push(id.clone());
            debug!(format = %id, "registering format plugin");
        }

        for extension in plugin.file_extensions() {
            let ids = self.by_extension.entry(normalize_extension(extension)).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }
        for mime in plugin.mime_types() {
            let ids = self.by_mime.entry(normalize_mime(mime)).or_default();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
        }

        self.plugins.insert(id, plugin);
    }

    /// Remove a plugin, its index entries and any alias pointing at it. No-op if absent.
    pub fn unregister(&mut self, format_id: &str) -> Option<Box<dyn FormatPlugin>> {
        let removed = self.plugins.remove(format_id)?;
        self.prune_indexes(format_id);
        self.order.retain(|id| id != format_id);
        self.aliases.retain(|_, target| target != format_id);
        debug!(format = %format_id, "unregistered format plugin");
        Some(removed)
    }

    fn prune_indexes(&mut self, format_id: &str) {
        for index in [&mut self.by_extension, &mut self.by_mime] {
            index.retain(|_, ids| {
                ids.retain(|id| id != format_id);
                !ids.is_empty()
            });
        }
    }

    /// Point `alias` at a registered plugin
    ///
    /// Ignored (returns false) when the target is unknown or the alias would shadow a real
    /// plugin id. Aliases are pointers, never forward declarations.
    pub fn register_alias(&mut self, alias: &str, canonical_id: &str) -> bool {
        let target = self.resolve_format(canonical_id).to_string();
        if !self.plugins.contains_key(&target) {
            warn!(alias, target = %canonical_id, "ignoring alias to unregistered format");
            return false;
        }
        if self.plugins.contains_key(alias) {
            warn!(alias, "ignoring alias that shadows a registered format");
            return false;
        }
        self.aliases.insert(alias.to_string(), target);
        true
    }

    /// Alias target if one exists, otherwise the input unchanged
    pub fn resolve_format<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Get a plugin by id or alias
    pub fn get(&self, id: &str) -> Option<&dyn FormatPlugin> {
        self.plugins
            .get(self.resolve_format(id))
            .map(|plugin| plugin.as_ref())
    }

    /// Check if a plugin exists (aliases count)
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// List all registered format ids (sorted)
    pub fn list_formats(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.plugins.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Registered aliases as `(alias, canonical)` pairs (sorted)
    pub fn aliases(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .aliases
            .iter()
            .map(|(alias, target)| (alias.clone(), target.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Plugins in registration order
    pub fn plugins(&self) -> impl Iterator<Item = &dyn FormatPlugin> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.plugins.get(id).map(|plugin| plugin.as_ref()))
    }

    pub fn list_metadata(&self) -> Vec<FormatMetadata> {
        self.plugins().map(|plugin| plugin.format_metadata()).collect()
    }

    /// Format ids declaring an extension (with or without the leading dot)
    pub fn formats_for_extension(&self, extension: &str) -> &[String] {
        self.by_extension
            .get(&normalize_extension(extension))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn formats_for_mime(&self, mime: &str) -> &[String] {
        self.by_mime
            .get(&normalize_mime(mime))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pick the plugin for a file
    ///
    /// Extension first, then MIME type, then sniffing against every plugin. A single
    /// candidate wins outright; several are narrowed by sniffing. `None` means nothing
    /// recognised the file and callers must treat it as a failure.
    pub fn detect_format(&self, file: &SourceFile) -> Option<&dyn FormatPlugin> {
        let text = file.text_lossy();

        let by_extension = file
            .extension_suffixes()
            .into_iter()
            .map(|suffix| self.formats_for_extension(&suffix))
            .find(|ids| !ids.is_empty())
            .unwrap_or(&[]);
        if let Some(found) = self.narrow(by_extension, &text) {
            debug!(file = %file.name, format = found.format_id(), "detected format by extension");
            return Some(found);
        }

        if let Some(mime) = &file.mime_type {
            if let Some(found) = self.narrow(self.formats_for_mime(mime), &text) {
                debug!(file = %file.name, format = found.format_id(), "detected format by MIME type");
                return Some(found);
            }
        }

        let detection = self.detect_format_from_content(&text, None)?;
        debug!(
            file = %file.name,
            format = %detection.format_id,
            confidence = %detection.confidence,
            "detected format by content"
        );
        self.get(&detection.format_id)
    }

    fn narrow(&self, candidates: &[String], text: &str) -> Option<&dyn FormatPlugin> {
        match candidates {
            [] => None,
            [only] => self.get(only),
            many => {
                let ids: Vec<&str> = many.iter().map(String::as_str).collect();
                let detection = self.detect_format_from_content(text, Some(ids.as_slice()))?;
                self.get(&detection.format_id)
            }
        }
    }

    /// Run sniffers and keep the strictly greatest confidence
    ///
    /// `candidates` restricts the run; `None` means every registered plugin. Ties keep the
    /// first candidate in registration order unless the registry breaks ties by priority.
    pub fn detect_format_from_content(
        &self,
        text: &str,
        candidates: Option<&[&str]>,
    ) -> Option<Detection> {
        let wanted: Option<Vec<&str>> =
            candidates.map(|ids| ids.iter().map(|id| self.resolve_format(id)).collect());

        let mut best: Option<(Detection, i32)> = None;
        for plugin in self.plugins() {
            if let Some(wanted) = &wanted {
                if !wanted.contains(&plugin.format_id()) {
                    continue;
                }
            }
            let Some(detect) = plugin.detector() else {
                continue;
            };
            let Some(confidence) = detect(text) else {
                continue;
            };

            let priority = plugin.priority();
            let better = match &best {
                None => true,
                Some((current, current_priority)) => {
                    if confidence.value() != current.confidence.value() {
                        confidence.value() > current.confidence.value()
                    } else {
                        self.tie_break == TieBreak::Priority && priority > *current_priority
                    }
                }
            };
            if better {
                best = Some((
                    Detection {
                        format_id: plugin.format_id().to_string(),
                        confidence,
                    },
                    priority,
                ));
            }
        }

        best.map(|(detection, _)| detection)
    }

    pub fn capabilities(&self, id: &str) -> Option<Capabilities> {
        self.get(id).map(|plugin| plugin.capabilities())
    }

    pub fn can_render(&self, id: &str) -> bool {
        self.capabilities(id).is_some_and(|caps| caps.render)
    }

    pub fn renderer_component(&self, id: &str) -> Option<ComponentHandle> {
        self.get(id).and_then(|plugin| plugin.renderer_component())
    }

    /// Specialized editor for the format, or the default editor
    pub fn editor_component(&self, id: &str) -> ComponentHandle {
        self.get(id)
            .and_then(|plugin| plugin.editor_component())
            .unwrap_or_else(|| self.default_editor.clone())
    }

    pub fn editor_config(&self, id: &str) -> EditorConfig {
        self.get(id)
            .and_then(|plugin| plugin.editor_config())
            .unwrap_or_default()
    }

    pub fn default_editor(&self) -> &ComponentHandle {
        &self.default_editor
    }

    /// Create a registry with the built-in formats and their aliases
    pub fn with_defaults() -> Self {
        Self::builtin(RegistryOptions::default(), crate::formats::MarkdownFormat::default())
    }

    /// Built-in formats with explicit options and a configured markdown plugin
    pub fn builtin(options: RegistryOptions, markdown: crate::formats::MarkdownFormat) -> Self {
        let mut registry = Self::with_options(options);

        registry.register(markdown);
        registry.register(crate::formats::gherkin::GherkinFormat);
        registry.register(crate::formats::perseus::PerseusFormat);
        registry.register(crate::formats::html5_app::Html5AppFormat);

        for alias in crate::formats::perseus::LEGACY_ALIASES {
            registry.register_alias(alias, crate::formats::perseus::FORMAT_ID);
        }

        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
