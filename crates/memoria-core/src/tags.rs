//! Tag normalization (component A).
//!
//! A tag's identity is its slug; the label is a last-writer-wins display
//! form. Slugging is deliberately simple and deterministic so two labels
//! that differ only in punctuation or case collapse onto the same tag.

use std::collections::HashSet;

/// Default cap on distinct tags carried by a single card (invariant 9).
pub const MAX_TAGS_PER_CARD: usize = 20;

/// Lowercase `label`, collapse every maximal run of non `[a-z0-9]` bytes
/// into a single `-`, and trim leading/trailing dashes. An empty result
/// (e.g. a label of only punctuation) maps to the literal `"tag"`.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_was_dash = false;
    for ch in label.trim().chars().flat_map(|c| c.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "tag".to_string()
    } else {
        slug
    }
}

/// Trim, drop empties, de-duplicate by slug (keeping the first label seen
/// for each slug), and truncate to `limit`. Order is stable.
pub fn normalize_labels(labels: impl IntoIterator<Item = impl AsRef<str>>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for label in labels {
        let clean = label.as_ref().trim();
        if clean.is_empty() {
            continue;
        }
        let slug = slugify(clean);
        if !seen.insert(slug) {
            continue;
        }
        result.push(clean.to_string());
        if result.len() == limit {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugifies_punctuation_and_case() {
        assert_eq!(slugify("  Rust / Async!! "), "rust-async");
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("???"), "tag");
        assert_eq!(slugify(""), "tag");
    }

    #[test]
    fn normalizes_dedupes_and_truncates() {
        let labels = vec!["Python", "python!", "  ", "Http", "http"];
        let normalized = normalize_labels(labels, 20);
        assert_eq!(normalized, vec!["Python".to_string(), "Http".to_string()]);
    }

    #[test]
    fn respects_limit() {
        let labels = (0..30).map(|i| format!("tag-{i}"));
        let normalized = normalize_labels(labels, MAX_TAGS_PER_CARD);
        assert_eq!(normalized.len(), MAX_TAGS_PER_CARD);
    }
}
