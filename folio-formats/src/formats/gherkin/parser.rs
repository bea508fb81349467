//! Gherkin parsing (feature text → [`Feature`])
//!
//! A single forward pass with an explicit state machine. Each source line is first classified
//! into a [`Line`], then [`Parser::feed`] applies the transition for `(state, line)`:
//!
//! | State        | Line                          | Effect / next state                         |
//! |--------------|-------------------------------|---------------------------------------------|
//! | Header       | tags                          | collect as feature tags                     |
//! | Header       | `Feature:`                    | set title → Description                     |
//! | Header       | anything else                 | skipped while scanning for `Feature:`       |
//! | Description  | text                          | append to feature description               |
//! | any block    | `Background:`                 | open background → Background                |
//! | any block    | tags                          | pending tags for the next scenario          |
//! | any block    | `Scenario:` / `Scenario Outline:` | open scenario (takes pending tags) → Scenario |
//! | Background, Scenario | step                  | append step                                 |
//! | Background, Scenario | table row             | append to the last step's data table        |
//! | Background, Scenario | `"""` / ```` ``` ```` | → DocString                                 |
//! | DocString    | matching fence                | attach to last step → previous block        |
//! | Scenario     | `Examples:`                   | open table → Examples                       |
//! | Examples     | table row                     | first row headers, then data rows           |
//! | Examples     | blank (after header) / keyword | close table → Scenario, then re-dispatch   |
//!
//! End of input closes open blocks; tags with nothing after them are reported, not applied.

use super::model::{Background, ExamplesTable, Feature, Scenario, ScenarioKind, Step, StepKeyword};

pub const UNKNOWN_FEATURE: &str = "Unknown Feature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Something the parser noticed; errors only block validation, never import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGherkin {
    pub feature: Feature,
    /// Whether a `Feature:` line was present
    pub has_feature_line: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classified source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Comment,
    Tags(Vec<String>),
    Feature(&'a str),
    Background(&'a str),
    Scenario(ScenarioKind, &'a str),
    Examples(&'a str),
    Step(StepKeyword, &'a str),
    TableRow(Vec<String>),
    DocStringFence(Fence),
    Text(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fence {
    Quotes,
    Backticks,
}

impl Fence {
    pub fn marker(self) -> &'static str {
        match self {
            Fence::Quotes => "\"\"\"",
            Fence::Backticks => "```",
        }
    }
}

fn keyword_title<'a>(line: &'a str, keywords: &[&str]) -> Option<&'a str> {
    keywords
        .iter()
        .find_map(|keyword| line.strip_prefix(keyword))
        .map(str::trim)
}

pub fn split_row(row: &str) -> Vec<String> {
    let inner = row.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Classify one line, independent of parser state
pub fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with("\"\"\"") {
        return Line::DocStringFence(Fence::Quotes);
    }
    if line.starts_with("```") {
        return Line::DocStringFence(Fence::Backticks);
    }
    if line.starts_with('#') {
        return Line::Comment;
    }
    if line.starts_with('@') {
        let tags = line
            .split_whitespace()
            .filter_map(|token| token.strip_prefix('@'))
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();
        return Line::Tags(tags);
    }
    if line.starts_with('|') {
        return Line::TableRow(split_row(line));
    }
    if let Some(title) = keyword_title(line, &["Feature:"]) {
        return Line::Feature(title);
    }
    if let Some(title) = keyword_title(line, &["Background:"]) {
        return Line::Background(title);
    }
    if let Some(title) = keyword_title(line, &["Scenario Outline:", "Scenario Template:"]) {
        return Line::Scenario(ScenarioKind::ScenarioOutline, title);
    }
    if let Some(title) = keyword_title(line, &["Scenario:", "Example:"]) {
        return Line::Scenario(ScenarioKind::Scenario, title);
    }
    if let Some(title) = keyword_title(line, &["Examples:", "Scenarios:"]) {
        return Line::Examples(title);
    }
    if let Some((word, rest)) = line.split_once(char::is_whitespace) {
        if let Some(keyword) = StepKeyword::from_word(word) {
            return Line::Step(keyword, rest.trim_start());
        }
    }
    Line::Text(line)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Background,
    Scenario,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Description,
    Background,
    Scenario,
    Examples,
    DocString { fence: Fence, resume: Block },
}

impl From<Block> for State {
    fn from(block: Block) -> Self {
        match block {
            Block::Background => State::Background,
            Block::Scenario => State::Scenario,
        }
    }
}

struct OpenDocString {
    opened_at: usize,
    indent: usize,
    lines: Vec<String>,
}

struct Parser {
    state: State,
    feature: Feature,
    has_feature_line: bool,
    description: Vec<String>,
    pending_tags: Vec<String>,
    pending_tags_line: usize,
    examples: Option<ExamplesTable>,
    doc_string: Option<OpenDocString>,
    warned_preamble: bool,
    line_no: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new() -> Self {
        Parser {
            state: State::Header,
            feature: Feature::default(),
            has_feature_line: false,
            description: Vec::new(),
            pending_tags: Vec::new(),
            pending_tags_line: 0,
            examples: None,
            doc_string: None,
            warned_preamble: false,
            line_no: 0,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, severity: Severity, code: &'static str, message: impl Into<String>) {
        let line = Some(self.line_no);
        self.report_at(severity, code, message, line);
    }

    fn report_at(
        &mut self,
        severity: Severity,
        code: &'static str,
        message: impl Into<String>,
        line: Option<usize>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            code,
            message: message.into(),
            line,
        });
    }

    fn steps_mut(&mut self, block: Block) -> Option<&mut Vec<Step>> {
        match block {
            Block::Background => self.feature.background.as_mut().map(|bg| &mut bg.steps),
            Block::Scenario => self.feature.scenarios.last_mut().map(|s| &mut s.steps),
        }
    }

    fn take_tags(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_tags)
    }

    fn close_examples(&mut self) {
        let Some(table) = self.examples.take() else {
            return;
        };
        match self.feature.scenarios.last_mut() {
            Some(scenario) if scenario.kind == ScenarioKind::ScenarioOutline => {
                scenario.examples.push(table);
            }
            _ => self.report(
                Severity::Warning,
                "EXAMPLES_ON_SCENARIO",
                "Examples belong to a Scenario Outline; table ignored",
            ),
        }
    }

    fn feed(&mut self, raw: &str) {
        self.line_no += 1;

        if let State::DocString { fence, resume } = self.state {
            self.feed_doc_string(raw, fence, resume);
            return;
        }

        let line = classify(raw);

        if self.state == State::Examples {
            let header_seen = self.examples.as_ref().is_some_and(|t| !t.headers.is_empty());
            let ends_table = match &line {
                Line::TableRow(_) | Line::Comment | Line::Text(_) => false,
                Line::Blank => header_seen,
                _ => true,
            };
            if ends_table {
                self.close_examples();
                self.state = State::Scenario;
            }
        }

        match (self.state, line) {
            (_, Line::Blank) | (_, Line::Comment) => {}

            (State::Header, Line::Tags(tags)) => {
                self.pending_tags.extend(tags);
                self.pending_tags_line = self.line_no;
            }
            (State::Header, Line::Feature(title)) => {
                self.feature.title = title.to_string();
                self.feature.tags = self.take_tags();
                self.has_feature_line = true;
                self.state = State::Description;
            }
            (State::Header, _) => {
                self.pending_tags.clear();
                if !self.warned_preamble {
                    self.warned_preamble = true;
                    self.report(
                        Severity::Warning,
                        "CONTENT_BEFORE_FEATURE",
                        "content before the Feature line is ignored",
                    );
                }
            }

            (_, Line::Feature(_)) => self.report(
                Severity::Warning,
                "DUPLICATE_FEATURE",
                "only one Feature per document; extra Feature line ignored",
            ),

            (State::Description, Line::Text(text)) => self.description.push(text.to_string()),

            (_, Line::Tags(tags)) => {
                self.pending_tags.extend(tags);
                self.pending_tags_line = self.line_no;
            }

            (_, Line::Background(title)) => {
                if self.feature.background.is_some() || !self.feature.scenarios.is_empty() {
                    self.report(
                        Severity::Warning,
                        "MISPLACED_BACKGROUND",
                        "Background must appear once, before the first scenario",
                    );
                }
                if !self.pending_tags.is_empty() {
                    self.pending_tags.clear();
                    self.report(Severity::Warning, "TAGS_ON_BACKGROUND", "tags on a Background are ignored");
                }
                self.feature.background = Some(Background {
                    title: title.to_string(),
                    steps: Vec::new(),
                });
                self.state = State::Background;
            }

            (_, Line::Scenario(kind, title)) => {
                let tags = self.take_tags();
                self.feature.scenarios.push(Scenario {
                    title: title.to_string(),
                    kind,
                    tags,
                    steps: Vec::new(),
                    examples: Vec::new(),
                    line: self.line_no,
                });
                self.state = State::Scenario;
            }

            (State::Background, Line::Step(keyword, text)) => {
                if let Some(steps) = self.steps_mut(Block::Background) {
                    steps.push(Step::new(keyword, text));
                }
            }
            (State::Scenario, Line::Step(keyword, text)) => {
                if let Some(steps) = self.steps_mut(Block::Scenario) {
                    steps.push(Step::new(keyword, text));
                }
            }
            (_, Line::Step(keyword, _)) => self.report(
                Severity::Warning,
                "ORPHAN_STEP",
                format!("'{keyword}' step outside a Background or Scenario is ignored"),
            ),

            (State::Scenario, Line::Examples(title)) => {
                self.examples = Some(ExamplesTable {
                    title: title.to_string(),
                    tags: self.take_tags(),
                    headers: Vec::new(),
                    rows: Vec::new(),
                });
                self.state = State::Examples;
            }
            (_, Line::Examples(_)) => self.report(
                Severity::Warning,
                "ORPHAN_EXAMPLES",
                "Examples outside a Scenario Outline are ignored",
            ),

            (State::Examples, Line::TableRow(cells)) => self.push_examples_row(cells),
            (state @ (State::Background | State::Scenario), Line::TableRow(cells)) => {
                let block = if state == State::Background {
                    Block::Background
                } else {
                    Block::Scenario
                };
                match self.steps_mut(block).and_then(|steps| steps.last_mut()) {
                    Some(step) => step.data_table.get_or_insert_with(Vec::new).push(cells),
                    None => self.report(Severity::Warning, "ORPHAN_TABLE", "table row without a step is ignored"),
                }
            }
            (_, Line::TableRow(_)) => {
                self.report(Severity::Warning, "ORPHAN_TABLE", "table row outside a step is ignored")
            }

            (state @ (State::Background | State::Scenario), Line::DocStringFence(fence)) => {
                let resume = if state == State::Background {
                    Block::Background
                } else {
                    Block::Scenario
                };
                if self.steps_mut(resume).map_or(true, |steps| steps.is_empty()) {
                    self.report(Severity::Warning, "ORPHAN_DOCSTRING", "doc string without a step is ignored");
                }
                self.doc_string = Some(OpenDocString {
                    opened_at: self.line_no,
                    indent: raw.len() - raw.trim_start().len(),
                    lines: Vec::new(),
                });
                self.state = State::DocString { fence, resume };
            }
            (_, Line::DocStringFence(_)) => self.report(
                Severity::Warning,
                "ORPHAN_DOCSTRING",
                "doc string outside a step is ignored",
            ),

            // Free text inside blocks (scenario descriptions, example notes) carries no structure.
            (_, Line::Text(_)) => {}
        }
    }

    fn push_examples_row(&mut self, cells: Vec<String>) {
        let line_no = self.line_no;
        let Some(table) = self.examples.as_mut() else {
            return;
        };
        if table.headers.is_empty() {
            table.headers = cells;
            return;
        }
        let expected = table.headers.len();
        let found = cells.len();
        table.rows.push(cells);
        if found != expected {
            self.report_at(
                Severity::Error,
                "TABLE_COLUMN_MISMATCH",
                format!("examples row has {found} cells, header has {expected}"),
                Some(line_no),
            );
        }
    }

    fn feed_doc_string(&mut self, raw: &str, fence: Fence, resume: Block) {
        if raw.trim_start().starts_with(fence.marker()) {
            self.close_doc_string(resume);
            self.state = resume.into();
            return;
        }
        if let Some(open) = self.doc_string.as_mut() {
            let strip = raw
                .char_indices()
                .take_while(|(idx, ch)| *idx < open.indent && *ch == ' ')
                .count();
            open.lines.push(raw[strip..].to_string());
        }
    }

    fn close_doc_string(&mut self, resume: Block) {
        let Some(open) = self.doc_string.take() else {
            return;
        };
        let content = open.lines.join("\n");
        if let Some(step) = self.steps_mut(resume).and_then(|steps| steps.last_mut()) {
            step.doc_string = Some(content);
        }
    }

    fn finish(mut self) -> ParsedGherkin {
        if let State::DocString { resume, .. } = self.state {
            let opened_at = self.doc_string.as_ref().map(|open| open.opened_at);
            self.report_at(
                Severity::Error,
                "UNCLOSED_DOCSTRING",
                "doc string is never closed",
                opened_at,
            );
            self.close_doc_string(resume);
        }
        if self.state == State::Examples {
            self.close_examples();
        }
        if !self.pending_tags.is_empty() {
            let line = Some(self.pending_tags_line);
            let tags = self.take_tags().join(", ");
            self.report_at(
                Severity::Warning,
                "DANGLING_TAGS",
                format!("tags [{tags}] are not followed by anything to tag"),
                line,
            );
        }
        if !self.has_feature_line {
            self.feature.title = UNKNOWN_FEATURE.to_string();
            self.report_at(Severity::Error, "MISSING_FEATURE", "no 'Feature:' line found", None);
        }

        let outline_issues: Vec<(usize, String)> = self
            .feature
            .scenarios
            .iter()
            .filter(|s| s.kind == ScenarioKind::ScenarioOutline && s.examples.is_empty())
            .map(|s| (s.line, s.title.clone()))
            .collect();
        for (line, title) in outline_issues {
            self.report_at(
                Severity::Warning,
                "OUTLINE_WITHOUT_EXAMPLES",
                format!("Scenario Outline '{title}' has no Examples"),
                Some(line),
            );
        }

        self.feature.description = self.description.join("\n");
        ParsedGherkin {
            feature: self.feature,
            has_feature_line: self.has_feature_line,
            diagnostics: self.diagnostics,
        }
    }
}

/// Parse Gherkin text. Never fails: problems become diagnostics.
pub fn parse_gherkin(text: &str) -> ParsedGherkin {
    let mut parser = Parser::new();
    for raw in text.lines() {
        parser.feed(raw);
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(parsed: &ParsedGherkin) -> Vec<&'static str> {
        parsed.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("  Given a thing"), Line::Step(StepKeyword::Given, "a thing"));
        assert_eq!(classify("And   spaced"), Line::Step(StepKeyword::And, "spaced"));
        assert_eq!(classify("Givenx"), Line::Text("Givenx"));
        assert_eq!(classify("Given"), Line::Text("Given"));
        assert_eq!(
            classify("Scenario Outline: Eat"),
            Line::Scenario(ScenarioKind::ScenarioOutline, "Eat")
        );
        assert_eq!(classify("Examples:"), Line::Examples(""));
        assert_eq!(classify("@a @b"), Line::Tags(vec!["a".into(), "b".into()]));
        assert_eq!(classify("| a | b |"), Line::TableRow(vec!["a".into(), "b".into()]));
        assert_eq!(classify("# comment"), Line::Comment);
    }

    #[test]
    fn test_minimal_feature() {
        let parsed = parse_gherkin("Feature: F\nScenario: S\n  Given a\n  When b\n  Then c");
        assert!(parsed.has_feature_line);
        assert_eq!(parsed.feature.title, "F");
        assert_eq!(parsed.feature.scenarios.len(), 1);
        let keywords: Vec<_> = parsed.feature.scenarios[0].steps.iter().map(|s| s.keyword).collect();
        assert_eq!(keywords, vec![StepKeyword::Given, StepKeyword::When, StepKeyword::Then]);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_header_description_and_tags() {
        let parsed = parse_gherkin(
            "@epic:governance @core\nFeature: Voting\n  Members vote on proposals.\n\n  Ballots are secret.\n\n  @smoke\n  Scenario: Cast\n    Given a ballot\n",
        );
        let feature = &parsed.feature;
        assert_eq!(feature.tags, vec!["epic:governance", "core"]);
        assert_eq!(feature.description, "Members vote on proposals.\nBallots are secret.");
        assert_eq!(feature.scenarios[0].tags, vec!["smoke"]);
    }

    #[test]
    fn test_missing_feature_defaults() {
        let parsed = parse_gherkin("just some words\n");
        assert!(!parsed.has_feature_line);
        assert_eq!(parsed.feature.title, UNKNOWN_FEATURE);
        assert!(codes(&parsed).contains(&"MISSING_FEATURE"));
    }

    #[test]
    fn test_feature_found_after_preamble() {
        let parsed = parse_gherkin("preamble\nFeature: Late\nScenario: S\n  Given x\n");
        assert_eq!(parsed.feature.title, "Late");
        assert_eq!(codes(&parsed), vec!["CONTENT_BEFORE_FEATURE"]);
    }

    #[test]
    fn test_background() {
        let parsed = parse_gherkin(
            "Feature: F\n  Background:\n    Given logged in\n    And on home\n  Scenario: S\n    When click\n",
        );
        let background = parsed.feature.background.as_ref().unwrap();
        assert_eq!(background.steps.len(), 2);
        assert_eq!(parsed.feature.scenarios[0].steps.len(), 1);
    }

    #[test]
    fn test_outline_examples() {
        let parsed = parse_gherkin(
            "Feature: F\n  Scenario Outline: Eat\n    Given <start> cukes\n\n    Examples:\n      | start | eat |\n      | 12    | 5   |\n      | 20    | 5   |\n",
        );
        let scenario = &parsed.feature.scenarios[0];
        assert_eq!(scenario.kind, ScenarioKind::ScenarioOutline);
        assert_eq!(scenario.examples.len(), 1);
        assert_eq!(scenario.examples[0].headers, vec!["start", "eat"]);
        assert_eq!(scenario.examples[0].rows.len(), 2);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_blank_before_header_row_keeps_table_open() {
        let parsed = parse_gherkin(
            "Feature: F\nScenario Outline: O\n  Given <x>\nExamples:\n\n  | x |\n  | 1 |\n",
        );
        let examples = &parsed.feature.scenarios[0].examples;
        assert_eq!(examples[0].headers, vec!["x"]);
        assert_eq!(examples[0].rows, vec![vec!["1".to_string()]]);
    }

    #[test]
    fn test_examples_on_plain_scenario_ignored() {
        let parsed = parse_gherkin("Feature: F\nScenario: S\n  Given x\nExamples:\n  | a |\n  | 1 |\n");
        assert!(parsed.feature.scenarios[0].examples.is_empty());
        assert!(codes(&parsed).contains(&"EXAMPLES_ON_SCENARIO"));
    }

    #[test]
    fn test_column_mismatch_is_error() {
        let parsed = parse_gherkin(
            "Feature: F\nScenario Outline: O\n  Given <a>\nExamples:\n  | a | b |\n  | 1 |\n",
        );
        let diag = parsed.diagnostics.iter().find(|d| d.code == "TABLE_COLUMN_MISMATCH").unwrap();
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.line, Some(6));
    }

    #[test]
    fn test_doc_string_and_data_table() {
        let parsed = parse_gherkin(
            "Feature: F\nScenario: S\n  Given a post\n    \"\"\"\n    Hello\n      indented\n    \"\"\"\n  And users\n    | name |\n    | ann  |\n",
        );
        let steps = &parsed.feature.scenarios[0].steps;
        assert_eq!(steps[0].doc_string.as_deref(), Some("Hello\n  indented"));
        assert_eq!(
            steps[1].data_table,
            Some(vec![vec!["name".to_string()], vec!["ann".to_string()]])
        );
    }

    #[test]
    fn test_unclosed_doc_string() {
        let parsed = parse_gherkin("Feature: F\nScenario: S\n  Given a\n    \"\"\"\n    text\n");
        let diag = parsed.diagnostics.iter().find(|d| d.code == "UNCLOSED_DOCSTRING").unwrap();
        assert_eq!(diag.line, Some(4));
        assert_eq!(parsed.feature.scenarios[0].steps[0].doc_string.as_deref(), Some("text"));
    }

    #[test]
    fn test_tag_line_at_end_of_file() {
        let parsed = parse_gherkin("Feature: F\nScenario: S\n  Given a\n@orphan\n");
        assert_eq!(codes(&parsed), vec!["DANGLING_TAGS"]);
        assert_eq!(parsed.diagnostics[0].line, Some(4));
        assert!(parsed.feature.scenarios[0].tags.is_empty());
    }

    #[test]
    fn test_step_before_scenario_reported() {
        let parsed = parse_gherkin("Feature: F\nGiven stray\n");
        assert!(codes(&parsed).contains(&"ORPHAN_STEP"));
    }
}
