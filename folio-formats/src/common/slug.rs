//! Identifier and anchor generation

use std::collections::HashSet;
use std::path::Path;

/// Lowercase, strip non-alphanumerics, turn whitespace into hyphens, collapse and trim hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// File name without any extension: `docs/user-stories.perseus.json` -> `user-stories`
pub fn file_stem(path: &str) -> &str {
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path);
    match name.char_indices().find(|(idx, ch)| *ch == '.' && *idx > 0) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Human title from a file name: hyphens/underscores become spaces, words are capitalized.
pub fn title_from_path(path: &str) -> String {
    file_stem(path)
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out slugs that are unique within one document.
///
/// The first occurrence keeps the plain slug, later ones get `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct UniqueSlugs {
    taken: HashSet<String>,
}

impl UniqueSlugs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Multiple   spaces -- here "), "multiple-spaces-here");
        assert_eq!(slugify("**Bold** Title"), "bold-title");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn title_from_path_capitalizes() {
        assert_eq!(title_from_path("docs/observer-protocol.md"), "Observer Protocol");
        assert_eq!(title_from_path("value_scanner.feature"), "Value Scanner");
    }

    #[test]
    fn file_stem_strips_all_extensions() {
        assert_eq!(file_stem("quiz/first-item.perseus.json"), "first-item");
        assert_eq!(file_stem("plain"), "plain");
    }

    #[test]
    fn unique_slugs_suffix_duplicates() {
        let mut slugs = UniqueSlugs::new();
        assert_eq!(slugs.claim("intro"), "intro");
        assert_eq!(slugs.claim("intro"), "intro-1");
        assert_eq!(slugs.claim("intro-1"), "intro-1-1");
        assert_eq!(slugs.claim("intro"), "intro-2");
    }

    proptest! {
        #[test]
        fn slugs_are_normalized(input in "[a-zA-Z0-9 ,.!?_-]{0,64}") {
            let slug = slugify(&input);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert_eq!(slugify(&slug), slug.clone());
        }
    }
}
