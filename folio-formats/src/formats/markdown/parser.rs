//! Markdown parsing (Markdown → structured document)
//!
//! A line-oriented pass, not a CommonMark parser: it only needs the structure that drives
//! content nodes. Pipeline: frontmatter → headings/sections → references and tags → summary.

use crate::common::slug::{file_stem, slugify, title_from_path, UniqueSlugs};
use crate::common::text::{summarize, word_count};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const FRONTMATTER_DELIMITER: &str = "---";

/// Description used when the document has no prose to summarize
pub const NO_DESCRIPTION: &str = "No description available";

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(Feature|Scenario):\s*([^\]]+?)\s*\]").expect("valid regex"));
static INLINE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)@([A-Za-z0-9_][A-Za-z0-9_:-]*)").expect("valid regex"));

/// A frontmatter value: a list when the raw value had a comma or bracket, otherwise scalar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontmatterValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FrontmatterValue::Scalar(value) => Some(value),
            FrontmatterValue::List(_) => None,
        }
    }

    /// Scalars count as one-element lists.
    pub fn items(&self) -> Vec<String> {
        match self {
            FrontmatterValue::Scalar(value) if value.is_empty() => Vec::new(),
            FrontmatterValue::Scalar(value) => vec![value.clone()],
            FrontmatterValue::List(items) => items.clone(),
        }
    }
}

pub type Frontmatter = BTreeMap<String, FrontmatterValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Feature,
    Scenario,
}

impl ReferenceKind {
    fn prefix(self) -> &'static str {
        match self {
            ReferenceKind::Feature => "feature",
            ReferenceKind::Scenario => "scenario",
        }
    }
}

/// An embedded `[Feature: name]` / `[Scenario: name]` link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub kind: ReferenceKind,
    pub target_id: String,
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub level: usize,
    pub anchor: String,
    pub content: String,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMarkdown {
    pub id: String,
    pub title: String,
    pub description: String,
    pub frontmatter: Frontmatter,
    /// Line (0-based) where the body starts, after any frontmatter
    #[serde(skip)]
    pub body_start: usize,
    pub sections: Vec<Section>,
    pub tags: BTreeSet<String>,
    pub feature_ids: Vec<String>,
    pub epic_ids: Vec<String>,
    pub related_ids: Vec<String>,
    pub word_count: usize,
    pub category: String,
}

/// Keyword → category table
///
/// A heuristic, not a classifier: the first rule whose keyword appears in the lowercased title
/// or in any tag wins, otherwise the fallback applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    pub rules: Vec<(String, String)>,
    pub fallback: String,
}

impl CategoryRules {
    pub fn categorize(&self, title: &str, tags: &BTreeSet<String>) -> String {
        let title = title.to_lowercase();
        self.rules
            .iter()
            .find(|(keyword, _)| {
                title.contains(keyword.as_str())
                    || tags.iter().any(|tag| tag.to_lowercase().contains(keyword.as_str()))
            })
            .map(|(_, category)| category.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        let rules = [
            ("observer", "observer"),
            ("value scanner", "value-scanner"),
            ("governance", "governance"),
            ("social", "social-medium"),
            ("autonomous", "autonomous-entity"),
            ("economic", "economic"),
        ];
        CategoryRules {
            rules: rules
                .iter()
                .map(|(keyword, category)| (keyword.to_string(), category.to_string()))
                .collect(),
            fallback: "general".to_string(),
        }
    }
}

/// Split a leading frontmatter block
///
/// Returns the parsed pairs and the index of the first body line. Without a closing
/// delimiter there is no frontmatter.
pub fn parse_frontmatter(lines: &[&str]) -> Option<(Frontmatter, usize)> {
    if lines.first().map(|line| line.trim_end()) != Some(FRONTMATTER_DELIMITER) {
        return None;
    }
    let close = lines
        .iter()
        .skip(1)
        .position(|line| line.trim_end() == FRONTMATTER_DELIMITER)?
        + 1;

    let mut frontmatter = Frontmatter::new();
    for line in &lines[1..close] {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        frontmatter.insert(key.to_string(), parse_frontmatter_value(value.trim()));
    }
    Some((frontmatter, close + 1))
}

fn parse_frontmatter_value(raw: &str) -> FrontmatterValue {
    if raw.contains(',') || raw.contains('[') {
        let items = raw
            .replace(['[', ']'], "")
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        FrontmatterValue::List(items)
    } else {
        FrontmatterValue::Scalar(raw.to_string())
    }
}

/// `## Title` → (2, "Title"). Up to six hashes followed by whitespace or end of line.
pub fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|ch| *ch == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((level, rest.trim().trim_end_matches('#').trim()))
}

pub fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn strip_bold(title: &str) -> String {
    title.replace("**", "").replace("__", "").trim().to_string()
}

fn references_in(body: &str) -> Vec<Reference> {
    REFERENCE_RE
        .captures_iter(body)
        .map(|caps| {
            let kind = if &caps[1] == "Feature" {
                ReferenceKind::Feature
            } else {
                ReferenceKind::Scenario
            };
            let name = caps[2].to_string();
            Reference {
                kind,
                target_id: format!("{}-{}", kind.prefix(), slugify(&name)),
                display_text: name,
            }
        })
        .collect()
}

/// Text up to the first blank line, leading blank lines skipped
fn first_paragraph(text: &str) -> &str {
    let text = text.trim_start();
    text.split("\n\n").next().unwrap_or_default()
}

/// Parse markdown text into sections, tags and cross-references
pub fn parse_markdown(text: &str, source_path: Option<&str>, categories: &CategoryRules) -> ParsedMarkdown {
    let lines: Vec<&str> = text.lines().collect();
    let (frontmatter, body_start) = parse_frontmatter(&lines).unwrap_or_default();

    let mut sections: Vec<Section> = Vec::new();
    let mut anchors = UniqueSlugs::new();
    let mut body = String::new();
    let mut preamble = String::new();
    let mut in_fence = false;

    let close_section = |sections: &mut Vec<Section>, body: &mut String| {
        if let Some(section) = sections.last_mut() {
            section.content = body.trim().to_string();
            section.references = references_in(&section.content);
        }
        body.clear();
    };

    for line in lines.iter().skip(body_start) {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        if !in_fence {
            if let Some((level, title)) = heading(line) {
                close_section(&mut sections, &mut body);
                let title = strip_bold(title);
                let anchor = anchors.claim(&slugify(&title));
                sections.push(Section {
                    title,
                    level,
                    anchor,
                    content: String::new(),
                    references: Vec::new(),
                });
                continue;
            }
        }
        let target = if sections.is_empty() { &mut preamble } else { &mut body };
        target.push_str(line);
        target.push('\n');
    }
    close_section(&mut sections, &mut body);

    let title = sections
        .iter()
        .find(|section| section.level == 1)
        .map(|section| section.title.clone())
        .filter(|title| !title.is_empty())
        .or_else(|| {
            frontmatter
                .get("title")
                .and_then(FrontmatterValue::as_scalar)
                .map(str::to_string)
        })
        .or_else(|| source_path.map(title_from_path))
        .unwrap_or_else(|| "Untitled".to_string());

    let mut tags: BTreeSet<String> = frontmatter
        .get("tags")
        .map(FrontmatterValue::items)
        .unwrap_or_default()
        .into_iter()
        .collect();
    for caps in INLINE_TAG_RE.captures_iter(text) {
        tags.insert(caps[1].to_string());
    }

    let prefixed = |prefix: &str| -> Vec<String> {
        tags.iter()
            .filter_map(|tag| tag.strip_prefix(prefix))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    };
    let feature_ids = prefixed("feature:");
    let epic_ids = prefixed("epic:");

    let mut related_ids: Vec<String> = feature_ids.iter().chain(&epic_ids).cloned().collect();
    if let Some(related) = frontmatter.get("related") {
        related_ids.extend(related.items());
    }

    let description = frontmatter
        .get("description")
        .and_then(FrontmatterValue::as_scalar)
        .map(str::to_string)
        .or_else(|| {
            sections
                .first()
                .map(|section| summarize(&section.content, 2))
                .filter(|summary| !summary.is_empty())
        })
        .or_else(|| Some(summarize(first_paragraph(&preamble), 2)).filter(|summary| !summary.is_empty()))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let id = match source_path {
        Some(path) => slugify(file_stem(path)),
        None => slugify(&title),
    };
    let category = categories.categorize(&title, &tags);

    ParsedMarkdown {
        id,
        title,
        description,
        frontmatter,
        body_start,
        sections,
        tags,
        feature_ids,
        epic_ids,
        related_ids,
        word_count: word_count(text),
        category,
    }
}
