//! Gherkin format implementation
//!
//! One `.feature` file imports as one feature node followed by one node per scenario:
//!
//! - feature node: `content` is the raw source; metadata carries `category`, `epicIds`,
//!   `scenarioIds`, `background` and the canonical `gherkin` text
//! - scenario node: `content` is the canonical scenario text; metadata carries `featureId`,
//!   `epicIds`, `scenarioType`, `steps`, `examples` and the source `line`
//!
//! Ids come from the last two segments of the source path (`governance/voting.feature` →
//! `governance-voting`), scenario ids append the slugified title. The feature lists every
//! scenario in `relatedNodeIds` and every scenario lists the feature, both followed by the
//! epic ids taken from `@epic:<id>` feature tags.
//!
//! Export accepts either a structured [`Feature`] value (re-serialized canonically) or text,
//! which is passed through with a `Feature:` header added when the text lacks one.

pub mod model;
pub mod parser;
pub mod serializer;

pub use model::{Background, ExamplesTable, Feature, Scenario, ScenarioKind, Step, StepKeyword};
pub use parser::{parse_gherkin, Diagnostic, ParsedGherkin, Severity};

use crate::common::slug::{file_stem, slugify, UniqueSlugs};
use crate::detect::{Confidence, DetectFn, Signals};
use crate::error::FormatError;
use crate::format::{
    attach_preview, Capabilities, ComponentHandle, EditorConfig, EditorMode, ExportOutput,
    FormatPlugin, ImportResult, SourceInput,
};
use crate::node::{ContentNode, ExportInput, NodeContent};
use crate::validation::{ValidationResult, ValidationWarning};
use parser::{classify, Line};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

pub const FORMAT_ID: &str = "gherkin";

const FALLBACK_KEY: &str = "feature";
const FALLBACK_CATEGORY: &str = "general";

/// Format implementation for Gherkin feature files
#[derive(Debug, Clone, Copy, Default)]
pub struct GherkinFormat;

fn detect_gherkin(text: &str) -> Option<Confidence> {
    let (mut feature, mut scenario, mut step, mut tags) = (false, false, false, false);
    for raw in text.lines() {
        match classify(raw) {
            Line::Feature(_) => feature = true,
            Line::Scenario(..) => scenario = true,
            Line::Step(..) => step = true,
            Line::Tags(found) if !found.is_empty() => tags = true,
            _ => {}
        }
    }
    Signals::new()
        .add(feature, 0.5)
        .add(scenario, 0.3)
        .add(step, 0.2)
        .add(tags, 0.1)
        .finish()
}

/// Path-derived key: `docs/governance/voting.feature` → `governance-voting`
fn path_key(source_path: Option<&str>, feature_title: &str) -> String {
    let from_path = source_path.map(|path| {
        let stem = slugify(file_stem(path));
        let parent = Path::new(path)
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .map(slugify)
            .unwrap_or_default();
        match (parent.is_empty(), stem.is_empty()) {
            (false, false) => format!("{parent}-{stem}"),
            (true, _) => stem,
            (false, true) => parent,
        }
    });
    from_path
        .filter(|key| !key.is_empty())
        .or_else(|| Some(slugify(feature_title)).filter(|key| !key.is_empty()))
        .unwrap_or_else(|| FALLBACK_KEY.to_string())
}

fn category(source_path: Option<&str>) -> String {
    source_path
        .and_then(|path| Path::new(path).parent())
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .map(slugify)
        .filter(|category| !category.is_empty())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

fn epic_ids(tags: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.iter()
        .filter_map(|tag| tag.strip_prefix("epic:"))
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn scenario_content(scenario: &Scenario) -> String {
    let text = serializer::serialize_scenario("", scenario);
    // Drop the synthetic feature header and re-indent one level up.
    text.lines()
        .skip(2)
        .map(|line| line.strip_prefix("  ").unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn a parsed feature into the feature node plus one node per scenario.
pub fn build_nodes(feature: &Feature, raw: &str, source_path: Option<&str>) -> Vec<ContentNode> {
    let key = path_key(source_path, &feature.title);
    let epics = epic_ids(&feature.tags);
    let category = category(source_path);

    let mut ids = UniqueSlugs::new();
    let feature_id = ids.claim(&key);
    let scenario_ids: Vec<String> = feature
        .scenarios
        .iter()
        .map(|scenario| {
            let slug = slugify(&scenario.title);
            let base = if slug.is_empty() {
                format!("{key}-scenario")
            } else {
                format!("{key}-{slug}")
            };
            ids.claim(&base)
        })
        .collect();

    let mut feature_node = ContentNode::new(feature_id.clone(), "feature");
    feature_node.title = feature.title.clone();
    feature_node.description = if feature.description.is_empty() {
        feature.title.clone()
    } else {
        feature.description.clone()
    };
    feature_node.content = NodeContent::Text(raw.to_string());
    feature_node.content_format = FORMAT_ID.to_string();
    feature_node.tags = feature.tags.iter().cloned().collect();
    feature_node.related_node_ids = scenario_ids.iter().chain(&epics).cloned().collect();
    feature_node.source_path = source_path.map(str::to_string);
    let metadata = &mut feature_node.metadata;
    metadata.insert("category".into(), json!(category));
    metadata.insert("epicIds".into(), json!(epics));
    metadata.insert("scenarioIds".into(), json!(scenario_ids));
    metadata.insert("scenarioCount".into(), json!(scenario_ids.len()));
    if let Some(background) = &feature.background {
        metadata.insert("background".into(), to_value(background));
    }
    metadata.insert("gherkin".into(), json!(serializer::serialize_feature(feature)));

    let mut nodes = Vec::with_capacity(feature.scenarios.len() + 1);
    nodes.push(feature_node);

    for (scenario, id) in feature.scenarios.iter().zip(scenario_ids) {
        let mut node = ContentNode::new(id, "scenario");
        node.title = scenario.title.clone();
        node.description = scenario.title.clone();
        node.content = NodeContent::Text(scenario_content(scenario));
        node.content_format = FORMAT_ID.to_string();
        node.tags = scenario.tags.iter().chain(&feature.tags).cloned().collect();
        node.related_node_ids = std::iter::once(feature_id.clone()).chain(epics.iter().cloned()).collect();
        node.source_path = source_path.map(str::to_string);

        let mut metadata = Map::new();
        metadata.insert("featureId".into(), json!(feature_id));
        metadata.insert("epicIds".into(), json!(epics));
        metadata.insert("category".into(), json!(category));
        metadata.insert("scenarioType".into(), json!(scenario.kind.as_str()));
        metadata.insert("steps".into(), to_value(&scenario.steps));
        if !scenario.examples.is_empty() {
            metadata.insert("examples".into(), to_value(&scenario.examples));
        }
        if scenario.line > 0 {
            metadata.insert("line".into(), json!(scenario.line));
        }
        node.metadata = metadata;
        nodes.push(node);
    }

    nodes
}

fn warning_from(diagnostic: &Diagnostic) -> ValidationWarning {
    let message = match diagnostic.line {
        Some(line) => format!("line {line}: {}", diagnostic.message),
        None => diagnostic.message.clone(),
    };
    ValidationWarning::new(diagnostic.code, message)
}

impl GherkinFormat {
    fn export_text(&self, text: &str, input: &ExportInput) -> String {
        let has_feature = text.lines().any(|line| matches!(classify(line), Line::Feature(_)));
        if has_feature {
            let mut out = text.trim_end().to_string();
            out.push('\n');
            return out;
        }

        let mut out = String::new();
        if !input.tags.is_empty() {
            let tags: Vec<String> = input.tags.iter().map(|tag| format!("@{tag}")).collect();
            out.push_str(&tags.join(" "));
            out.push('\n');
        }
        let title = if input.title.trim().is_empty() {
            parser::UNKNOWN_FEATURE
        } else {
            input.title.trim()
        };
        out.push_str(&format!("Feature: {title}\n"));
        for line in input.description.lines().filter(|line| !line.trim().is_empty()) {
            out.push_str(&format!("  {}\n", line.trim()));
        }
        let body = text.trim();
        if !body.is_empty() {
            out.push('\n');
            for line in body.lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&format!("  {line}\n"));
                }
            }
        }
        out
    }
}

impl FormatPlugin for GherkinFormat {
    fn format_id(&self) -> &str {
        FORMAT_ID
    }

    fn display_name(&self) -> &str {
        "Gherkin"
    }

    fn description(&self) -> &str {
        "Behavior specifications: features, scenarios and Given/When/Then steps"
    }

    fn file_extensions(&self) -> &[&str] {
        &[".feature"]
    }

    fn mime_types(&self) -> &[&str] {
        &["text/x-gherkin"]
    }

    fn priority(&self) -> i32 {
        5
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            render: false,
            ..Capabilities::ALL
        }
    }

    fn supports_round_trip(&self) -> bool {
        true
    }

    fn import(&self, input: SourceInput<'_>) -> Result<ImportResult, FormatError> {
        let text = input.as_text()?;
        let parsed = parse_gherkin(text);
        let warnings = parsed.diagnostics.iter().map(warning_from).collect();
        Ok(ImportResult {
            nodes: build_nodes(&parsed.feature, text, input.source_path()),
            warnings,
        })
    }

    fn export(&self, input: &ExportInput) -> Result<ExportOutput, FormatError> {
        let text = match &input.content {
            NodeContent::Structured(value) => {
                let feature: Feature = serde_json::from_value(value.clone()).map_err(|err| {
                    FormatError::SerializationError(format!("not a gherkin feature: {err}"))
                })?;
                serializer::serialize_feature(&feature)
            }
            NodeContent::Text(text) => self.export_text(text, input),
        };
        Ok(ExportOutput::Text(text))
    }

    fn validate(&self, input: SourceInput<'_>) -> ValidationResult {
        let mut result = ValidationResult::new();
        let text = match input.as_text() {
            Ok(text) => text,
            Err(err) => {
                result.error("INVALID_ENCODING", err.to_string(), None);
                return result;
            }
        };
        if text.trim().is_empty() {
            result.error("EMPTY_CONTENT", "document is empty", None);
            return result;
        }

        let parsed = parse_gherkin(text);
        for diagnostic in &parsed.diagnostics {
            match diagnostic.severity {
                Severity::Error => result.error(diagnostic.code, diagnostic.message.clone(), diagnostic.line),
                Severity::Warning => result.warn(warning_from(diagnostic)),
            }
        }

        let feature = &parsed.feature;
        if parsed.has_feature_line && feature.scenarios.is_empty() {
            result.warn(
                ValidationWarning::new("NO_SCENARIOS", "feature has no scenarios")
                    .with_suggestion("Add a 'Scenario:' with Given/When/Then steps"),
            );
        }
        for scenario in &feature.scenarios {
            let line = scenario.line;
            match scenario.steps.first() {
                None => result.warn(ValidationWarning::new(
                    "EMPTY_SCENARIO",
                    format!("line {line}: scenario '{}' has no steps", scenario.title),
                )),
                Some(step) if step.keyword.is_conjunction() => result.warn(
                    ValidationWarning::new(
                        "LEADING_CONJUNCTION",
                        format!("line {line}: scenario '{}' starts with '{}'", scenario.title, step.keyword),
                    )
                    .with_suggestion("Start with Given, When or Then"),
                ),
                Some(_) => {}
            }
        }

        result.stat("scenarios", feature.scenarios.len());
        result.stat("steps", feature.step_count());
        result.stat(
            "examples",
            feature.scenarios.iter().map(|s| s.examples.len()).sum(),
        );

        attach_preview(self, input, &mut result);
        result
    }

    fn detector(&self) -> Option<DetectFn> {
        Some(detect_gherkin)
    }

    fn renderer_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("gherkin-renderer"))
    }

    fn editor_component(&self) -> Option<ComponentHandle> {
        Some(ComponentHandle::from_static("gherkin-editor"))
    }

    fn editor_config(&self) -> Option<EditorConfig> {
        Some(EditorConfig {
            mode: EditorMode::Code,
            language: Some(FORMAT_ID.to_string()),
            show_preview: false,
            word_wrap: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key() {
        assert_eq!(path_key(Some("docs/governance/voting.feature"), "x"), "governance-voting");
        assert_eq!(path_key(Some("voting.feature"), "x"), "voting");
        assert_eq!(path_key(None, "Ballot Casting"), "ballot-casting");
        assert_eq!(path_key(None, ""), "feature");
    }

    #[test]
    fn test_detect_weights() {
        assert_eq!(detect_gherkin("nothing here"), None);
        let full = detect_gherkin("@a\nFeature: F\nScenario: S\nGiven x").unwrap();
        assert!((full.value() - 1.0).abs() < 1e-9);
        let feature_only = detect_gherkin("Feature: F").unwrap();
        assert!((feature_only.value() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_titles_get_suffixes() {
        let parsed = parse_gherkin("Feature: F\nScenario: Same\n  Given a\nScenario: Same\n  Given b\n");
        let nodes = build_nodes(&parsed.feature, "", Some("x/f.feature"));
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x-f", "x-f-same", "x-f-same-1"]);
    }

    #[test]
    fn test_scenario_content_is_dedented() {
        let parsed = parse_gherkin("Feature: F\n  Scenario: S\n    Given a\n");
        let nodes = build_nodes(&parsed.feature, "", None);
        assert_eq!(nodes[1].content.as_text(), Some("Scenario: S\n  Given a"));
    }

    #[test]
    fn test_export_wraps_bare_scenarios() {
        let input = ExportInput {
            title: "Voting".into(),
            tags: vec!["core".into()],
            content: NodeContent::Text("Scenario: Cast\n  Given a ballot".into()),
            ..Default::default()
        };
        let output = GherkinFormat.export(&input).unwrap();
        let ExportOutput::Text(text) = output else {
            panic!("expected text");
        };
        assert_eq!(text, "@core\nFeature: Voting\n\n  Scenario: Cast\n    Given a ballot\n");
        assert!(parse_gherkin(&text).diagnostics.is_empty());
    }
}
