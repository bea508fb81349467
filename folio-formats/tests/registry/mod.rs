//! Registry tests against the built-in formats

mod aliases;
mod detection;
