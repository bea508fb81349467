//! Error types for format and service operations
//!
//! Two tiers: [`FormatError`] is what a single plugin reports, [`ServiceError`] is what the
//! orchestration layer (editor and IO services) surfaces to callers. Registry lookups never
//! error, they return `None`.

use thiserror::Error;

/// Errors that can occur inside a format plugin
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// The input cannot be interpreted as this format at all
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Error during export
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// The plugin does not implement the requested operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

/// Errors raised by a [`ContentStore`](crate::services::storage::ContentStore) collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage rejected node '{id}': {reason}")]
    Rejected { id: String, reason: String },
}

/// Errors surfaced by the editor and IO services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no format plugin registered for '{format_id}'")]
    FormatNotFound { format_id: String },
    #[error("could not detect the format of '{name}'")]
    UndetectableFormat { name: String },
    #[error("draft '{0}' does not exist")]
    DraftNotFound(String),
    #[error("format '{format_id}' produced binary output where text was expected")]
    BinaryOutput { format_id: String },
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
