//! Small text utilities shared by the line parsers

/// Split prose into sentences on `.`, `!` or `?` followed by whitespace or end of text.
pub fn sentences(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && chars.peek().map_or(true, |next| next.is_whitespace())
        {
            let sentence = current.trim();
            if !sentence.is_empty() {
                result.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        result.push(rest.to_string());
    }
    result
}

/// First `count` sentences, with an ellipsis when more were available.
pub fn summarize(text: &str, count: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let all = sentences(&flattened);
    let mut summary = all.iter().take(count).cloned().collect::<Vec<_>>().join(" ");
    if all.len() > count {
        summary.push_str("...");
    }
    summary
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
