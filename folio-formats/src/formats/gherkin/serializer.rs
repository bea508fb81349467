//! Gherkin serialization (model → canonical feature text)
//!
//! Output is canonical rather than source-preserving: two-space indentation per level,
//! tables padded to column width, doc strings fenced with `"""`, comments dropped.

use super::model::{Background, ExamplesTable, Feature, Scenario, Step};

const INDENT: &str = "  ";

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}

fn push_tags(out: &mut String, depth: usize, tags: &[String]) {
    if tags.is_empty() {
        return;
    }
    let line = tags
        .iter()
        .map(|tag| format!("@{}", tag.trim_start_matches('@')))
        .collect::<Vec<_>>()
        .join(" ");
    push_line(out, depth, &line);
}

fn titled(keyword: &str, title: &str) -> String {
    if title.is_empty() {
        format!("{keyword}:")
    } else {
        format!("{keyword}: {title}")
    }
}

fn push_table(out: &mut String, depth: usize, rows: &[Vec<String>]) {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!(" {cell:<width$} "))
            .collect();
        push_line(out, depth, &format!("|{}|", cells.join("|")));
    }
}

fn push_steps(out: &mut String, depth: usize, steps: &[Step]) {
    for step in steps {
        push_line(out, depth, &format!("{} {}", step.keyword, step.text));
        if let Some(doc) = &step.doc_string {
            push_line(out, depth + 1, "\"\"\"");
            for line in doc.lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    push_line(out, depth + 1, line);
                }
            }
            push_line(out, depth + 1, "\"\"\"");
        }
        if let Some(table) = &step.data_table {
            push_table(out, depth + 1, table);
        }
    }
}

fn push_background(out: &mut String, depth: usize, background: &Background) {
    push_line(out, depth, &titled("Background", &background.title));
    push_steps(out, depth + 1, &background.steps);
}

fn push_examples(out: &mut String, depth: usize, examples: &ExamplesTable) {
    push_tags(out, depth, &examples.tags);
    push_line(out, depth, &titled("Examples", &examples.title));
    let mut rows = Vec::with_capacity(examples.rows.len() + 1);
    rows.push(examples.headers.clone());
    rows.extend(examples.rows.iter().cloned());
    push_table(out, depth + 1, &rows);
}

fn push_scenario(out: &mut String, depth: usize, scenario: &Scenario) {
    push_tags(out, depth, &scenario.tags);
    push_line(out, depth, &titled(scenario.kind.keyword(), &scenario.title));
    push_steps(out, depth + 1, &scenario.steps);
    for examples in &scenario.examples {
        out.push('\n');
        push_examples(out, depth + 1, examples);
    }
}

/// Serialize a whole feature.
pub fn serialize_feature(feature: &Feature) -> String {
    let mut out = String::new();
    push_tags(&mut out, 0, &feature.tags);
    push_line(&mut out, 0, &titled("Feature", &feature.title));
    for line in feature.description.lines() {
        push_line(&mut out, 1, line.trim());
    }
    if let Some(background) = &feature.background {
        out.push('\n');
        push_background(&mut out, 1, background);
    }
    for scenario in &feature.scenarios {
        out.push('\n');
        push_scenario(&mut out, 1, scenario);
    }
    out
}

/// Serialize one scenario under a minimal feature header, so the result parses on its own.
pub fn serialize_scenario(feature_title: &str, scenario: &Scenario) -> String {
    let mut out = String::new();
    push_line(&mut out, 0, &titled("Feature", feature_title));
    out.push('\n');
    push_scenario(&mut out, 1, scenario);
    out
}
