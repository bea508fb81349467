//! Shared configuration loader for the folio toolchain.
//!
//! `defaults/folio.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`FolioConfig`],
//! then turn the sections into the option types `folio-formats` consumes.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use folio_formats::formats::markdown::{CategoryRules, MarkdownFormat};
use folio_formats::format::ComponentHandle;
use folio_formats::services::EditorPolicy;
use folio_formats::{FormatRegistry, RegistryOptions, TieBreak};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

const DEFAULT_TOML: &str = include_str!("../defaults/folio.default.toml");

/// Top-level configuration consumed by folio applications.
#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
    pub registry: RegistryConfig,
    pub editor: EditorConfig,
    pub markdown: MarkdownConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub default_editor: String,
    pub tie_break: TieBreakConfig,
    /// Alias → canonical id, applied after the built-in aliases
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TieBreakConfig {
    #[serde(rename = "registration")]
    Registration,
    #[serde(rename = "priority")]
    Priority,
}

impl From<TieBreakConfig> for TieBreak {
    fn from(config: TieBreakConfig) -> Self {
        match config {
            TieBreakConfig::Registration => TieBreak::RegistrationOrder,
            TieBreakConfig::Priority => TieBreak::Priority,
        }
    }
}

impl From<&RegistryConfig> for RegistryOptions {
    fn from(config: &RegistryConfig) -> Self {
        RegistryOptions {
            default_editor: ComponentHandle::new(config.default_editor.clone()),
            tie_break: config.tie_break.into(),
        }
    }
}

/// Editing permissions.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    pub allow_editing: bool,
    /// Empty disables the generated-content check
    pub generated_id_pattern: String,
    pub stamp_updated_at: bool,
}

impl EditorConfig {
    /// Compile into an [`EditorPolicy`]; a bad pattern is reported as a config error.
    pub fn to_policy(&self) -> Result<EditorPolicy, ConfigError> {
        let mut policy = EditorPolicy::new(self.allow_editing, Some(&self.generated_id_pattern))
            .map_err(|err| {
                ConfigError::Message(format!("editor.generated_id_pattern: {err}"))
            })?;
        policy.stamp_updated_at = self.stamp_updated_at;
        Ok(policy)
    }
}

/// Keyword rules behind the Markdown `category` metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub fallback_category: String,
    #[serde(default)]
    pub categories: Vec<CategoryRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRuleConfig {
    pub keyword: String,
    pub category: String,
}

impl From<&MarkdownConfig> for CategoryRules {
    fn from(config: &MarkdownConfig) -> Self {
        CategoryRules {
            rules: config
                .categories
                .iter()
                .map(|rule| (rule.keyword.to_lowercase(), rule.category.clone()))
                .collect(),
            fallback: config.fallback_category.clone(),
        }
    }
}

/// Registry with the built-in formats, configured the way `config` says.
///
/// Configured aliases that point nowhere or shadow a plugin id are skipped with a warning.
pub fn build_registry(config: &FolioConfig) -> FormatRegistry {
    let markdown = MarkdownFormat::with_categories(CategoryRules::from(&config.markdown));
    let mut registry = FormatRegistry::builtin(RegistryOptions::from(&config.registry), markdown);
    for (alias, canonical) in &config.registry.aliases {
        if !registry.register_alias(alias, canonical) {
            warn!(alias = %alias, target = %canonical, "configured alias ignored");
        }
    }
    registry
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<FolioConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<FolioConfig, ConfigError> {
    Loader::new().build()
}
