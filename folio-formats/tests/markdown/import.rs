//! Import tests for the Markdown format (Markdown → nodes)

use crate::common::fixture;
use folio_formats::format::{FormatPlugin, SourceInput};
use folio_formats::formats::markdown::{CategoryRules, MarkdownFormat};
use serde_json::json;

fn import_fixture() -> folio_formats::ContentNode {
    let text = fixture("value-scanner.md");
    let result = MarkdownFormat::default()
        .import(SourceInput::text_at(&text, "epics/value-scanner.md"))
        .expect("Should import markdown");
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    result.nodes.into_iter().next().expect("one node")
}

#[test]
fn test_identity_fields() {
    let node = import_fixture();
    assert_eq!(node.id, "value-scanner");
    assert_eq!(node.title, "Value Scanner");
    assert_eq!(node.content_type, "epic");
    assert_eq!(node.content_format, "markdown");
    assert_eq!(node.source_path.as_deref(), Some("epics/value-scanner.md"));
    assert_eq!(
        node.description,
        "The value scanner surfaces invisible contributions. It runs weekly...."
    );
}

#[test]
fn test_tags_and_related_ids() {
    let node = import_fixture();
    let tags: Vec<&str> = node.tags.iter().map(String::as_str).collect();
    assert_eq!(tags, vec!["draft", "epic:economic", "scanner"]);
    assert_eq!(node.related_node_ids, vec!["economic", "care-economy"]);
    assert_eq!(node.metadata["epicIds"], json!(["economic"]));
}

#[test]
fn test_sections_skip_fenced_headings_and_get_unique_anchors() {
    let node = import_fixture();
    let sections = node.metadata["sections"].as_array().unwrap();
    let anchors: Vec<&str> = sections.iter().map(|s| s["anchor"].as_str().unwrap()).collect();
    assert_eq!(anchors, vec!["value-scanner", "inputs", "inputs-1"]);

    let references = sections[1]["references"].as_array().unwrap();
    assert_eq!(references.len(), 2);
    assert_eq!(references[0]["targetId"], json!("feature-contribution-log"));
    assert_eq!(references[1]["displayText"], json!("Weekly scan"));
}

#[test]
fn test_category_heuristic() {
    let node = import_fixture();
    assert_eq!(node.metadata["category"], json!("value-scanner"));

    let custom = CategoryRules {
        rules: vec![("ledger".into(), "accounting".into())],
        fallback: "misc".into(),
    };
    let text = fixture("value-scanner.md");
    let result = MarkdownFormat::with_categories(custom)
        .import(SourceInput::text(&text))
        .unwrap();
    assert_eq!(result.nodes[0].metadata["category"], json!("misc"));
}

#[test]
fn test_frontmatter_list_forms_are_equivalent() {
    let format = MarkdownFormat::default();
    let bracketed = format
        .import(SourceInput::text("---\ntags: [a, b]\n---\n# T\n"))
        .unwrap();
    let bare = format
        .import(SourceInput::text("---\ntags: a, b\n---\n# T\n"))
        .unwrap();
    assert_eq!(bracketed.nodes[0].tags, bare.nodes[0].tags);
    assert_eq!(bracketed.nodes[0].tags.len(), 2);
}

#[test]
fn test_title_from_file_name_when_no_heading() {
    let result = MarkdownFormat::default()
        .import(SourceInput::text_at("just prose", "notes/care-economy_basics.md"))
        .unwrap();
    assert_eq!(result.nodes[0].title, "Care Economy Basics");
    assert_eq!(result.warnings[0].code, "MISSING_TITLE");
}
