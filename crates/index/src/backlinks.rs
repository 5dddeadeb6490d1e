//! Backlink extraction.

use kg_core::Backlink;
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `[[slug]]` (captured in group 1) or `[slug]` (captured in group
/// 2), where `slug` follows the same `[a-z0-9][a-z0-9-]*` shape as a node
/// slug.
static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([a-z0-9][a-z0-9-]*)\]\]|\[([a-z0-9][a-z0-9-]*)\]").unwrap()
});

/// Extract every `[[slug]]`/`[slug]` token from `text` as a backlink from
/// `from_bullet_id`. Duplicate tokens in the same bullet produce one
/// backlink per occurrence; callers that want a deduplicated edge set
/// should dedupe on `(from_bullet_id, to_slug)` themselves.
pub fn extract_backlinks(from_bullet_id: &str, text: &str) -> Vec<Backlink> {
    LINK_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| Backlink {
            from_bullet_id: from_bullet_id.to_string(),
            to_slug: m.as_str().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_bracket_token_is_a_backlink() {
        let links = extract_backlinks("b-1", "alpha [[beta-node]] gamma");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].to_slug, "beta-node");
    }

    #[test]
    fn single_bracket_token_is_a_backlink() {
        let links = extract_backlinks("b-1", "see [other-slug] for detail");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].to_slug, "other-slug");
    }

    #[test]
    fn scenario_one_from_spec() {
        // spec.md §8 scenario 1: the backlinks table has (id, "b-link").
        let links = extract_backlinks("b-xyz", "alpha [b-link] beta");
        assert_eq!(links, vec![Backlink {
            from_bullet_id: "b-xyz".to_string(),
            to_slug: "b-link".to_string(),
        }]);
    }

    #[test]
    fn no_tokens_yields_no_backlinks() {
        assert!(extract_backlinks("b-1", "plain text, no links here").is_empty());
    }

    #[test]
    fn multiple_tokens_each_produce_an_edge() {
        let links = extract_backlinks("b-1", "[[one]] and [[two]] and [three]");
        let slugs: Vec<&str> = links.iter().map(|l| l.to_slug.as_str()).collect();
        assert_eq!(slugs, vec!["one", "two", "three"]);
    }

    #[test]
    fn uppercase_or_invalid_slug_shape_is_ignored() {
        assert!(extract_backlinks("b-1", "[[Not_Valid]]").is_empty());
    }
}
