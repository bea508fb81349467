//! IoService against the file system

use crate::common::fixture_path;
use folio_formats::services::IoService;
use folio_formats::{ExportInput, FormatRegistry, NodeContent, ServiceError};
use serde_json::json;

#[tokio::test]
async fn test_import_file_detects_format() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);

    let result = io
        .import_file(fixture_path("governance/voting.feature"), None)
        .await
        .expect("Should import fixture");
    assert_eq!(result.nodes.len(), 4);
    assert_eq!(result.nodes[0].content_format, "gherkin");
}

#[tokio::test]
async fn test_import_file_with_explicit_alias() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);

    let result = io
        .import_file(fixture_path("addition.perseus.json"), Some("quiz-json"))
        .await
        .unwrap();
    let node = result.primary().unwrap();
    assert_eq!(node.id, "addition");
    assert_eq!(node.title, "Single digit addition");
    assert_eq!(node.metadata["hintCount"], json!(1));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);
    let dir = tempfile::tempdir().unwrap();
    let err = io
        .import_file(dir.path().join("absent.md"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Io(_)));
}

#[tokio::test]
async fn test_download_writes_named_file() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);
    let dir = tempfile::tempdir().unwrap();

    let input = ExportInput {
        title: "Reaching Quorum".into(),
        content: NodeContent::Text("Scenario: Quorum\n  Given two votes".into()),
        ..Default::default()
    };
    let path = io.download(&input, "gherkin", dir.path().join("out")).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "reaching-quorum.feature");

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("Feature: Reaching Quorum\n"));
}

#[tokio::test]
async fn test_download_binary_export() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);
    let dir = tempfile::tempdir().unwrap();

    let input = ExportInput {
        title: "Orbit".into(),
        content: NodeContent::Structured(json!({"files": {"index.html": "<p>orbit</p>"}})),
        ..Default::default()
    };
    let path = io.download(&input, "html5-app", dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "orbit.zip");
    assert!(std::fs::read(&path).unwrap().starts_with(b"PK"));

    assert!(matches!(
        io.export_to_string(&input, "html5-app"),
        Err(ServiceError::BinaryOutput { format_id }) if format_id == "html5-app"
    ));
}

#[test]
fn test_import_string_and_validate() {
    let registry = FormatRegistry::with_defaults();
    let io = IoService::new(&registry);

    let result = io
        .import_string("# Hello\n\nWorld.", "markdown", Some("docs/hello.md"))
        .unwrap();
    assert_eq!(result.nodes[0].id, "hello");

    let file = folio_formats::SourceFile::new("broken.feature", b"no feature here".to_vec());
    let validation = io.validate(&file, None).unwrap();
    assert!(!validation.is_valid());
    assert!(validation.has_error("MISSING_FEATURE"));

    let detection = io.detect(&file).unwrap();
    assert_eq!(detection.format_id, "gherkin");
}
