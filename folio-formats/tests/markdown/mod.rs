//! Markdown format tests

mod import;
mod round_trip;
