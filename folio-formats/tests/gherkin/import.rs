//! Import tests for the Gherkin format (feature text → feature + scenario nodes)

use crate::common::fixture;
use folio_formats::format::{FormatPlugin, SourceInput};
use folio_formats::formats::gherkin::GherkinFormat;
use folio_formats::ContentNode;
use serde_json::json;

fn import(text: &str, path: Option<&str>) -> Vec<ContentNode> {
    let input = match path {
        Some(path) => SourceInput::text_at(text, path),
        None => SourceInput::text(text),
    };
    GherkinFormat.import(input).expect("Should import gherkin").nodes
}

#[test]
fn test_minimal_feature() {
    let nodes = import("Feature: F\nScenario: S\n  Given a\n  When b\n  Then c", None);
    assert_eq!(nodes.len(), 2);
    let (feature, scenario) = (&nodes[0], &nodes[1]);

    assert_eq!(feature.content_type, "feature");
    assert_eq!(scenario.content_type, "scenario");
    let keywords: Vec<&str> = scenario.metadata["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["keyword"].as_str().unwrap())
        .collect();
    assert_eq!(keywords, vec!["Given", "When", "Then"]);

    assert!(feature.is_related_to(&scenario.id));
    assert!(scenario.is_related_to(&feature.id));
}

#[test]
fn test_outline_examples_table() {
    let nodes = import(
        "Feature: F\nScenario Outline: O\n  Given <a> and <b>\nExamples:\n  | a | b |\n  | 1 | 2 |\n  | 3 | 4 |\n",
        None,
    );
    let examples = nodes[1].metadata["examples"].as_array().unwrap();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0]["headers"].as_array().unwrap().len(), 2);
    assert_eq!(examples[0]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(nodes[1].metadata["scenarioType"], json!("scenario_outline"));
}

#[test]
fn test_fixture_ids_and_links() {
    let text = fixture("governance/voting.feature");
    let nodes = import(&text, Some("features/governance/voting.feature"));
    let ids: Vec<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "governance-voting",
            "governance-voting-cast-a-ballot",
            "governance-voting-reaching-quorum",
            "governance-voting-publish-the-result",
        ]
    );

    let feature = &nodes[0];
    assert_eq!(feature.title, "Proposal voting");
    assert_eq!(
        feature.description,
        "Members decide on proposals by voting.\nEach member holds one ballot per proposal."
    );
    assert_eq!(feature.content.as_text(), Some(text.as_str()));
    assert_eq!(feature.metadata["category"], json!("governance"));
    assert_eq!(feature.metadata["epicIds"], json!(["governance"]));
    assert_eq!(feature.metadata["background"]["steps"].as_array().unwrap().len(), 2);
    assert_eq!(
        feature.related_node_ids,
        vec![
            "governance-voting-cast-a-ballot",
            "governance-voting-reaching-quorum",
            "governance-voting-publish-the-result",
            "governance",
        ]
    );

    for scenario in &nodes[1..] {
        assert_eq!(scenario.related_node_ids, vec!["governance-voting", "governance"]);
        assert_eq!(scenario.metadata["featureId"], json!("governance-voting"));
    }
}

#[test]
fn test_scenario_tags_inherit_feature_tags() {
    let text = fixture("governance/voting.feature");
    let nodes = import(&text, None);
    let tags: Vec<&str> = nodes[1].tags.iter().map(String::as_str).collect();
    assert_eq!(tags, vec!["core", "epic:governance", "smoke"]);
}

#[test]
fn test_doc_string_step() {
    let text = fixture("governance/voting.feature");
    let nodes = import(&text, None);
    let steps = nodes[3].metadata["steps"].as_array().unwrap();
    assert_eq!(steps[2]["docString"], json!("Proposal \"Plant trees\" passed."));
}

#[test]
fn test_fixture_validates_cleanly() {
    let text = fixture("governance/voting.feature");
    let result = GherkinFormat.validate(SourceInput::text(&text));
    assert!(result.is_valid(), "{:?}", result.errors);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    let stats = result.stats.as_ref().unwrap();
    assert_eq!(stats["scenarios"], 3);
    assert_eq!(stats["steps"], 9);
    assert!(result.parsed_preview.is_some());
}

#[test]
fn test_missing_feature_still_imports() {
    let nodes = import("Scenario: Lonely\n  Given nothing\n", None);
    assert_eq!(nodes[0].title, "Unknown Feature");

    let result = GherkinFormat.validate(SourceInput::text("Scenario: Lonely\n  Given nothing\n"));
    assert!(result.has_error("MISSING_FEATURE"));
}

#[test]
fn test_validation_warnings() {
    let result = GherkinFormat.validate(SourceInput::text(
        "Feature: F\nScenario: Empty\nScenario: Joined\n  And then what\n",
    ));
    assert!(result.is_valid());
    assert!(result.has_warning("EMPTY_SCENARIO"));
    assert!(result.has_warning("LEADING_CONJUNCTION"));
}
