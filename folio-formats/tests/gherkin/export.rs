//! Export tests for the Gherkin format

use crate::common::fixture;
use folio_formats::format::{ExportOutput, FormatPlugin, SourceInput};
use folio_formats::formats::gherkin::{parse_gherkin, GherkinFormat};
use folio_formats::node::{ExportInput, NodeContent};
use insta::assert_snapshot;

fn export_text(input: &ExportInput) -> String {
    match GherkinFormat.export(input).expect("Should export") {
        ExportOutput::Text(text) => text,
        ExportOutput::Binary(_) => panic!("gherkin exports text"),
    }
}

#[test]
fn test_structured_export_is_canonical() {
    let parsed = parse_gherkin("Feature: Tally\nScenario: Count\nGiven ballots\n|a|bb|\n|ccc|d|\n");
    let input = ExportInput {
        content: NodeContent::Structured(serde_json::to_value(&parsed.feature).unwrap()),
        ..Default::default()
    };
    assert_snapshot!(export_text(&input), @r"
    Feature: Tally

      Scenario: Count
        Given ballots
          | a   | bb |
          | ccc | d  |
    ");
}

#[test]
fn test_text_export_keeps_source() {
    let text = fixture("governance/voting.feature");
    let node = GherkinFormat
        .import(SourceInput::text(&text))
        .unwrap()
        .nodes
        .remove(0);
    let exported = export_text(&ExportInput::from(&node));
    assert_eq!(exported.trim_end(), text.trim_end());
}

#[test]
fn test_scenario_node_exports_as_standalone_feature() {
    let text = fixture("governance/voting.feature");
    let nodes = GherkinFormat.import(SourceInput::text(&text)).unwrap().nodes;
    let mut scenario = ExportInput::from(&nodes[1]);
    scenario.title = "Proposal voting".into();
    scenario.tags.clear();

    let exported = export_text(&scenario);
    let reparsed = parse_gherkin(&exported);
    assert!(reparsed.diagnostics.is_empty(), "{:?}", reparsed.diagnostics);
    assert_eq!(reparsed.feature.title, "Proposal voting");
    assert_eq!(reparsed.feature.scenarios[0].title, "Cast a ballot");
    assert_eq!(reparsed.feature.scenarios[0].tags, vec!["smoke"]);
}

#[test]
fn test_structured_export_rejects_other_shapes() {
    let input = ExportInput {
        content: NodeContent::Structured(serde_json::json!({"nope": 1})),
        ..Default::default()
    };
    assert!(GherkinFormat.export(&input).is_err());
}
