//! Pluggable content formats for Folio
//!
//!     This crate converts between source syntaxes (Markdown, Gherkin, Perseus quiz JSON,
//!     zipped HTML5 apps) and one canonical [`ContentNode`] shape, validates sources, exports
//!     nodes back to source and guesses which format an unlabelled blob is.
//!
//!     This is a pure lib: it powers folio-cli but makes no assumptions about a shell. Nothing
//!     here prints, reads env vars or installs a logger; it only emits `tracing` events.
//!
//! Architecture
//!
//!     .
//!     ├── error.rs                # FormatError / ServiceError
//!     ├── node.rs                 # ContentNode, ExportInput, ExportPatch
//!     ├── validation.rs           # ValidationResult (errors block, warnings don't)
//!     ├── detect.rs               # Confidence and weighted signals
//!     ├── format.rs               # FormatPlugin trait and its inputs/outputs
//!     ├── registry.rs             # FormatRegistry: ids, aliases, extension/MIME indexes, detection
//!     ├── formats
//!     │   ├── markdown            # parser.rs, serializer.rs
//!     │   ├── gherkin             # model.rs, parser.rs (state machine), serializer.rs
//!     │   ├── perseus             # model.rs
//!     │   └── html5_app           # archive.rs
//!     ├── services                # EditorService, IoService, storage/clipboard seams
//!     └── common                  # slugs and sentence helpers shared by the parsers
//!
//! The Registry
//!
//!     There is no global plugin map. A [`FormatRegistry`] is built once (usually with
//!     [`FormatRegistry::with_defaults`] or from configuration) and passed by reference to every
//!     consumer. Lookups go through alias resolution and return `None` on a miss so callers can
//!     fall back (default editor, generic viewer); only the services turn a miss into an error.
//!
//! Detection
//!
//!     Each plugin may expose a sniffer returning a [`Confidence`] in (0, 1], or nothing when it
//!     abstains. Files are matched by extension, then MIME type, then sniffing; the highest
//!     confidence wins and ties go to registration order unless the registry is configured to
//!     prefer declared priority.
//!
//! Testing
//!
//!     tests
//!     ├── <area>
//!     │   └── <testname>.rs
//!     └── fixtures
//!
//!     Rust does not discover tests in subdirectories, so tests/lib.rs includes each area.

pub mod common;
pub mod detect;
pub mod error;
pub mod format;
pub mod formats;
pub mod node;
pub mod registry;
pub mod services;
pub mod validation;

pub use detect::{Confidence, Detection};
pub use error::{FormatError, ServiceError, StorageError};
pub use format::{ExportOutput, FormatPlugin, ImportResult, SourceFile, SourceInput};
pub use node::{ContentNode, ExportInput, ExportPatch, NodeContent};
pub use registry::{FormatRegistry, RegistryOptions, TieBreak};
pub use validation::{ValidationResult, ValidationWarning};
