//! Alias resolution

use folio_formats::FormatRegistry;
use proptest::prelude::*;

#[test]
fn test_legacy_quiz_aliases() {
    let registry = FormatRegistry::with_defaults();
    for alias in ["perseus-quiz-json", "perseus-json", "quiz-json"] {
        assert_eq!(registry.resolve_format(alias), "perseus");
        let plugin = registry.get(alias).expect("alias resolves to a plugin");
        assert_eq!(plugin.format_id(), "perseus");
    }
    assert_eq!(registry.resolve_format("latex"), "latex");
}

#[test]
fn test_aliases_do_not_appear_as_formats() {
    let registry = FormatRegistry::with_defaults();
    assert_eq!(
        registry.list_formats(),
        vec!["gherkin", "html5-app", "markdown", "perseus"]
    );
    assert_eq!(registry.aliases().len(), 3);
}

#[test]
fn test_unregistering_target_drops_aliases() {
    let mut registry = FormatRegistry::with_defaults();
    registry.unregister("perseus");
    assert!(registry.aliases().is_empty());
    assert!(!registry.has("quiz-json"));
}

proptest! {
    #[test]
    fn resolve_is_idempotent(id in "[a-z-]{0,20}") {
        let mut registry = FormatRegistry::with_defaults();
        registry.register_alias("md", "markdown");
        let once = registry.resolve_format(&id).to_string();
        let twice = registry.resolve_format(&once).to_string();
        prop_assert_eq!(once, twice);
    }
}
