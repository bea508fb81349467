//! Format detection over real files

use crate::common::fixture;
use folio_formats::format::SourceFile;
use folio_formats::formats::html5_app::archive;
use folio_formats::FormatRegistry;

fn detected(registry: &FormatRegistry, file: &SourceFile) -> Option<String> {
    registry
        .detect_format(file)
        .map(|plugin| plugin.format_id().to_string())
}

#[test]
fn test_by_extension() {
    let registry = FormatRegistry::with_defaults();
    let cases = [
        ("notes.md", "markdown"),
        ("NOTES.MARKDOWN", "markdown"),
        ("voting.feature", "gherkin"),
        ("q1.perseus.json", "perseus"),
        ("q1.quiz.json", "perseus"),
        ("orbit.zip", "html5-app"),
    ];
    for (name, expected) in cases {
        let file = SourceFile::new(name, Vec::new());
        assert_eq!(detected(&registry, &file).as_deref(), Some(expected), "{name}");
    }
}

#[test]
fn test_by_content_when_extension_is_unknown() {
    let registry = FormatRegistry::with_defaults();

    let feature = SourceFile::new("spec.txt", fixture("governance/voting.feature"));
    assert_eq!(detected(&registry, &feature).as_deref(), Some("gherkin"));

    let markdown = SourceFile::new("readme.txt", fixture("value-scanner.md"));
    assert_eq!(detected(&registry, &markdown).as_deref(), Some("markdown"));

    let quiz = SourceFile::new("addition.json", fixture("addition.perseus.json"));
    assert_eq!(detected(&registry, &quiz).as_deref(), Some("perseus"));

    let zip = archive::build([("index.html", b"<p></p>".as_slice())]).unwrap();
    let app = SourceFile::new("upload", zip);
    assert_eq!(detected(&registry, &app).as_deref(), Some("html5-app"));
}

#[test]
fn test_by_mime_type() {
    let registry = FormatRegistry::with_defaults();
    let file = SourceFile::new("upload", b"{}".to_vec()).with_mime_type("application/json");
    assert_eq!(detected(&registry, &file).as_deref(), Some("perseus"));
}

#[test]
fn test_nothing_matches() {
    let registry = FormatRegistry::with_defaults();
    assert_eq!(detected(&registry, &SourceFile::new("data.bin", b"\x00\x7f".to_vec())), None);
    assert!(registry.detect_format_from_content("", None).is_none());
}

#[test]
fn test_confidence_stays_in_range() {
    let registry = FormatRegistry::with_defaults();
    for text in ["", "{", "[]", "# x", "Feature: F", "PK\u{3}\u{4}", "- a\n**b**"] {
        if let Some(detection) = registry.detect_format_from_content(text, None) {
            let value = detection.confidence.value();
            assert!(value > 0.0 && value <= 1.0, "{text:?} gave {value}");
        }
    }
}

#[test]
fn test_unregister_clears_lookups() {
    let mut registry = FormatRegistry::with_defaults();
    assert!(registry.unregister("gherkin").is_some());
    assert!(registry.formats_for_extension(".feature").is_empty());
    assert!(registry.formats_for_mime("text/x-gherkin").is_empty());
    assert!(registry.unregister("gherkin").is_none());
}
