//! Shared helpers used by several formats

pub mod slug;
pub mod text;
