//! Gherkin format tests

mod export;
mod import;
