//! EditorService end to end: open, edit, validate, export, save

use folio_formats::format::{FormatPlugin, SourceInput};
use folio_formats::formats::markdown::MarkdownFormat;
use folio_formats::services::{ContentStore, EditorPolicy, EditorService, MemoryStore};
use folio_formats::{ExportOutput, ExportPatch, FormatRegistry, NodeContent};

#[tokio::test]
async fn test_edit_existing_markdown_node() {
    let registry = FormatRegistry::with_defaults();
    let store = MemoryStore::new();
    let mut editor = EditorService::new(&registry, store.clone());

    let node = MarkdownFormat::default()
        .import(SourceInput::text_at("# Intro\n\nFirst draft.\n", "intro.md"))
        .unwrap()
        .nodes
        .remove(0);
    assert!(editor.can_edit(Some(&node)));

    let draft_id = editor.create_draft(&node).id.clone();
    assert!(!editor.get_draft(&draft_id).unwrap().is_dirty);

    editor
        .update_draft(
            &draft_id,
            ExportPatch::content(NodeContent::Text("# Intro\n\nSecond draft.\n".into())),
        )
        .unwrap();
    let validation = editor.validate_draft(&draft_id).unwrap();
    assert!(validation.is_valid(), "{:?}", validation.errors);

    let ExportOutput::Text(text) = editor.export_draft(&draft_id).unwrap() else {
        panic!("markdown exports text");
    };
    assert!(text.contains("id: intro\n"));
    assert!(text.contains("updated: "));
    assert!(text.ends_with("# Intro\n\nSecond draft.\n"));

    let saved = editor.save_content(&draft_id).await.unwrap();
    assert_eq!(saved.node_id, "intro");
    assert!(!editor.get_draft(&draft_id).unwrap().is_dirty);

    let stored = store.load("intro").await.unwrap().unwrap();
    assert_eq!(stored.content.as_text(), Some("# Intro\n\nSecond draft.\n"));
}

#[test]
fn test_unstamped_exports_are_deterministic() {
    let registry = FormatRegistry::with_defaults();
    let policy = EditorPolicy {
        stamp_updated_at: false,
        ..EditorPolicy::default()
    };
    let mut editor = EditorService::with_policy(&registry, MemoryStore::new(), policy);
    let draft_id = editor.create_new_draft("markdown", None).id.clone();
    editor.update_draft(&draft_id, ExportPatch::title("Plain")).unwrap();

    let first = editor.export_draft(&draft_id).unwrap();
    let second = editor.export_draft(&draft_id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.into_bytes(), b"# Plain\n".to_vec());
}

#[test]
fn test_delete_draft() {
    let registry = FormatRegistry::with_defaults();
    let mut editor = EditorService::new(&registry, MemoryStore::new());
    let draft_id = editor.create_new_draft("gherkin", None).id.clone();
    assert!(editor.delete_draft(&draft_id).is_some());
    assert!(editor.get_draft(&draft_id).is_none());
    assert!(editor.delete_draft(&draft_id).is_none());
}
