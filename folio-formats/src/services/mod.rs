//! Orchestration over the registry
//!
//! [`EditorService`] owns draft sessions, [`IoService`] moves content between files, strings,
//! downloads and the clipboard. Both borrow a [`FormatRegistry`](crate::registry::FormatRegistry)
//! built once at startup and turn a missing plugin into a named [`ServiceError`](crate::error::ServiceError).

pub mod editor;
pub mod io;
pub mod storage;

pub use editor::{ContentDraft, EditorPolicy, EditorService, SaveResult};
pub use io::{Blob, Clipboard, IoService, MemoryClipboard};
pub use storage::{ContentStore, MemoryStore};
