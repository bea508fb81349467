//! Markdown serialization (node fields → Markdown export)
//!
//! Output layout: regenerated frontmatter, `# Title`, then the body. Frontmatter and a leading
//! title heading already present in the content are dropped so exports do not stack them.

use super::parser::{heading, parse_frontmatter, FrontmatterValue, FRONTMATTER_DELIMITER};
use crate::error::FormatError;
use crate::node::{ExportInput, NodeContent};
use chrono::SecondsFormat;

/// Keys this serializer owns; any other frontmatter key is carried over untouched.
const GENERATED_KEYS: [&str; 4] = ["id", "type", "tags", "updated"];

pub fn serialize_to_markdown(input: &ExportInput) -> Result<String, FormatError> {
    let source = match &input.content {
        NodeContent::Text(text) => text.as_str(),
        NodeContent::Structured(_) => {
            return Err(FormatError::SerializationError(
                "markdown export needs text content, got a structured value".to_string(),
            ))
        }
    };

    let lines: Vec<&str> = source.lines().collect();
    let (existing, body_start) = parse_frontmatter(&lines).unwrap_or_default();
    let body = strip_leading_title(&lines[body_start..], &input.title);

    let mut frontmatter: Vec<(String, String)> = Vec::new();
    if let Some(id) = input.id.as_deref().filter(|id| !id.is_empty()) {
        frontmatter.push(("id".into(), id.to_string()));
    }
    if !input.content_type.is_empty() {
        frontmatter.push(("type".into(), input.content_type.clone()));
    }
    if !input.tags.is_empty() {
        let mut tags = input.tags.clone();
        tags.sort();
        tags.dedup();
        frontmatter.push(("tags".into(), format!("[{}]", tags.join(", "))));
    }
    for (key, value) in &existing {
        if GENERATED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let rendered = match value {
            FrontmatterValue::Scalar(scalar) => scalar.clone(),
            FrontmatterValue::List(items) => format!("[{}]", items.join(", ")),
        };
        frontmatter.push((key.clone(), rendered));
    }
    if let Some(updated) = input.updated_at {
        frontmatter.push((
            "updated".into(),
            updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
    }

    // Blocks are separated by one blank line; the output never ends in one.
    let mut blocks: Vec<String> = Vec::new();
    if !frontmatter.is_empty() {
        let mut block = format!("{FRONTMATTER_DELIMITER}\n");
        for (key, value) in &frontmatter {
            block.push_str(&format!("{key}: {value}\n"));
        }
        block.push_str(FRONTMATTER_DELIMITER);
        blocks.push(block);
    }
    if !input.title.trim().is_empty() {
        blocks.push(format!("# {}", input.title.trim()));
    }
    let body = body.trim();
    if !body.is_empty() {
        blocks.push(body.to_string());
    }

    let mut output = blocks.join("\n\n");
    if !output.is_empty() {
        output.push('\n');
    }
    Ok(output)
}

/// Body text without its first heading when that heading is the H1 carrying `title`.
fn strip_leading_title(lines: &[&str], title: &str) -> String {
    let first = lines.iter().position(|line| !line.trim().is_empty());
    let skip = match first {
        Some(idx) => match heading(lines[idx]) {
            Some((1, text)) if text.replace("**", "").trim() == title.trim() => idx + 1,
            _ => 0,
        },
        None => 0,
    };
    lines[skip..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn input(content: &str) -> ExportInput {
        ExportInput {
            id: Some("intro".into()),
            title: "Intro".into(),
            content_type: "concept".into(),
            content: NodeContent::Text(content.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_export_layout() {
        let mut export = input("---\nid: old\nauthor: Me\n---\n# Intro\n\nBody text.\n");
        export.tags = vec!["b".into(), "a".into()];
        export.updated_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        let output = serialize_to_markdown(&export).unwrap();
        insta::assert_snapshot!(output, @r"
        ---
        id: intro
        type: concept
        tags: [a, b]
        author: Me
        updated: 2024-05-01T12:00:00Z
        ---

        # Intro

        Body text.
        ");
    }

    #[test]
    fn test_export_is_deterministic() {
        let export = input("Body only.");
        assert_eq!(
            serialize_to_markdown(&export).unwrap(),
            serialize_to_markdown(&export).unwrap()
        );
    }

    #[test]
    fn test_different_leading_heading_is_kept() {
        let output = serialize_to_markdown(&input("# Other\n\nText")).unwrap();
        assert!(output.contains("# Intro\n\n# Other\n\nText"));
    }

    #[test]
    fn test_empty_body_has_no_trailing_blank_line() {
        let mut export = input("");
        export.id = None;
        export.content_type = String::new();
        assert_eq!(serialize_to_markdown(&export).unwrap(), "# Intro\n");

        let output = serialize_to_markdown(&input("# Intro\n")).unwrap();
        assert_eq!(output, "---\nid: intro\ntype: concept\n---\n\n# Intro\n");
    }

    #[test]
    fn test_structured_content_rejected() {
        let mut export = input("");
        export.content = NodeContent::Structured(serde_json::json!({}));
        assert!(matches!(
            serialize_to_markdown(&export),
            Err(FormatError::SerializationError(_))
        ));
    }
}
