//! Gherkin document model

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl StepKeyword {
    pub const ALL: [StepKeyword; 5] = [
        StepKeyword::Given,
        StepKeyword::When,
        StepKeyword::Then,
        StepKeyword::And,
        StepKeyword::But,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
            StepKeyword::But => "But",
        }
    }

    pub fn from_word(word: &str) -> Option<StepKeyword> {
        StepKeyword::ALL.into_iter().find(|keyword| keyword.as_str() == word)
    }

    pub fn is_conjunction(self) -> bool {
        matches!(self, StepKeyword::And | StepKeyword::But)
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub keyword: StepKeyword,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<Vec<Vec<String>>>,
}

impl Step {
    pub fn new(keyword: StepKeyword, text: impl Into<String>) -> Self {
        Step {
            keyword,
            text: text.into(),
            doc_string: None,
            data_table: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub title: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    #[default]
    Scenario,
    ScenarioOutline,
}

impl ScenarioKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ScenarioKind::Scenario => "Scenario",
            ScenarioKind::ScenarioOutline => "Scenario Outline",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::Scenario => "scenario",
            ScenarioKind::ScenarioOutline => "scenario_outline",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplesTable {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: ScenarioKind,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub examples: Vec<ExamplesTable>,
    /// 1-based line of the `Scenario:` keyword, 0 when built in memory
    #[serde(default)]
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    pub fn step_count(&self) -> usize {
        let background = self.background.as_ref().map_or(0, |bg| bg.steps.len());
        background + self.scenarios.iter().map(|s| s.steps.len()).sum::<usize>()
    }
}
