//! Format implementations
//!
//! This module contains the built-in plugins that convert between source syntax and
//! [`ContentNode`](crate::node::ContentNode)s.

pub mod gherkin;
pub mod html5_app;
pub mod markdown;
pub mod perseus;

pub use gherkin::GherkinFormat;
pub use html5_app::Html5AppFormat;
pub use markdown::{CategoryRules, MarkdownFormat};
pub use perseus::PerseusFormat;
