//! Export → import round trips for Markdown

use folio_formats::format::{ExportOutput, FormatPlugin, SourceInput};
use folio_formats::formats::markdown::MarkdownFormat;
use folio_formats::node::ExportInput;

fn export_text(input: &ExportInput) -> String {
    match MarkdownFormat::default().export(input).expect("Should export") {
        ExportOutput::Text(text) => text,
        ExportOutput::Binary(_) => panic!("markdown exports text"),
    }
}

#[test]
fn test_title_and_body_survive() {
    let format = MarkdownFormat::default();
    let original = format
        .import(SourceInput::text("# Care Work\n\nCare work is work. It deserves credit.\n"))
        .unwrap();
    let node = original.primary().unwrap();

    let exported = export_text(&ExportInput::from(node));
    let reimported = format.import(SourceInput::text(&exported)).unwrap();
    let again = reimported.primary().unwrap();

    assert_eq!(again.title, node.title);
    assert_eq!(again.description, node.description);
    assert_eq!(
        again.metadata["sections"][0]["content"],
        node.metadata["sections"][0]["content"]
    );
}

#[test]
fn test_repeated_export_does_not_stack_frontmatter() {
    let format = MarkdownFormat::default();
    let first = format
        .import(SourceInput::text("---\nauthor: Kim\n---\n# Notes\n\nBody.\n"))
        .unwrap();
    let once = export_text(&ExportInput::from(first.primary().unwrap()));

    let second = format.import(SourceInput::text(&once)).unwrap();
    let twice = export_text(&ExportInput::from(second.primary().unwrap()));

    assert_eq!(once, twice);
    assert_eq!(twice.matches("---").count(), 2);
    assert_eq!(twice.matches("# Notes").count(), 1);
}
