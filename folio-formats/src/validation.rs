//! Validation results
//!
//! Errors block an operation, warnings never do. A result is valid exactly when it carries no
//! errors; the flag is derived, never stored.

use crate::node::ContentNode;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A blocking problem in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

/// A non-blocking quality signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationWarning {
            code: code.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub stats: Option<BTreeMap<String, usize>>,
    /// Best-effort import of the validated source.
    pub parsed_preview: Option<ContentNode>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, code: &str, message: impl Into<String>, line: Option<usize>) {
        self.errors.push(ValidationError {
            code: code.to_string(),
            message: message.into(),
            line,
        });
    }

    pub fn warn(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    pub fn stat(&mut self, key: &str, value: usize) {
        self.stats
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value);
    }

    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 5)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.serialize_field("stats", &self.stats)?;
        state.serialize_field("parsedPreview", &self.parsed_preview)?;
        state.end()
    }
}
