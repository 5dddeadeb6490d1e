//! Context formatting: group bullets by node; per
//! node emit a header (slug, title, optional ⚠ flag), its selected bullets
//! in insertion order, and an "Explore" hint of up to 5 backlinked slugs.
//! Output is bounded by a caller-supplied character budget.
//!
//! spec.md's header names a "title" alongside the slug, but the data model
//! has no separate title field on `Node` — just `slug`. This
//! formats a humanized title by replacing `-` with spaces and capitalizing
//! words, recorded as an Open Question decision in DESIGN.md.

use kg_core::Bullet;

/// Up to how many backlinked slugs the "Explore" hint lists.
pub const EXPLORE_HINT_LIMIT: usize = 5;

/// One bullet carrying its final (post-rerank) relevance score, in the
/// order the ranker selected it.
#[derive(Debug, Clone)]
pub struct RankedBullet {
    pub bullet: Bullet,
    pub score: f32,
}

/// The rendered context block plus the bookkeeping the caller needs to
/// feed back into the budget accountant and session tracker.
#[derive(Debug, Clone)]
pub struct FormattedContext {
    pub text: String,
    /// `(slug, chars_served)` for every node that contributed text that
    /// made it into `text`.
    pub served_chars: Vec<(String, u64)>,
    /// Every bullet id that made it into `text`, for session dedup
    ///.
    pub bullet_ids: Vec<String>,
    /// Set when the character budget cut the block short of every
    /// candidate the ranker selected.
    pub truncated: bool,
}

fn humanize_title(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the final context block.
///
/// `candidates` must already be in final rank order. Nodes are emitted in order of first appearance in that
/// list; within a node, bullets are reordered to insertion order.
///
/// `is_flagged(slug)` and `backlinks(slug)` are supplied by the caller so
/// this module stays free of any dependency on `kg-index`/`kg-store`.
pub fn format_context(
    candidates: &[RankedBullet],
    char_budget: usize,
    is_flagged: impl Fn(&str) -> bool,
    backlinks: impl Fn(&str) -> Vec<String>,
) -> FormattedContext {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<&RankedBullet>> = std::collections::HashMap::new();
    for c in candidates {
        let slug = &c.bullet.slug;
        if !groups.contains_key(slug) {
            order.push(slug.clone());
        }
        groups.entry(slug.clone()).or_default().push(c);
    }

    let mut text = String::new();
    let mut served_chars = Vec::new();
    let mut bullet_ids = Vec::new();
    let mut truncated = false;

    'outer: for slug in &order {
        let mut bullets = groups.remove(slug).unwrap_or_default();
        bullets.sort_by(|a, b| a.bullet.created_at.cmp(&b.bullet.created_at));

        let flag = if is_flagged(slug) { " \u{26A0}" } else { "" };
        let header = format!("## {} ({}){}\n", humanize_title(slug), slug, flag);

        if text.chars().count() + header.chars().count() > char_budget {
            truncated = true;
            break;
        }
        let section_start = text.chars().count();
        text.push_str(&header);

        let mut node_chars: u64 = 0;
        let mut any_bullet = false;
        for ranked in &bullets {
            let line = format!("- {}\n", ranked.bullet.text);
            if text.chars().count() + line.chars().count() > char_budget {
                truncated = true;
                break;
            }
            text.push_str(&line);
            node_chars += ranked.bullet.char_len() as u64;
            bullet_ids.push(ranked.bullet.id.clone());
            any_bullet = true;
        }

        if !any_bullet {
            // The header fit but not a single bullet did; drop the bare
            // header rather than emit an empty section.
            text.truncate(text.char_indices().nth(section_start).map(|(i, _)| i).unwrap_or(0));
            truncated = true;
            break 'outer;
        }

        let hint_slugs = backlinks(slug);
        if !hint_slugs.is_empty() {
            let hint = format!(
                "Explore: {}\n",
                hint_slugs
                    .iter()
                    .take(EXPLORE_HINT_LIMIT)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            if text.chars().count() + hint.chars().count() <= char_budget {
                text.push_str(&hint);
            }
        }
        text.push('\n');

        served_chars.push((slug.clone(), node_chars));
        if truncated {
            break;
        }
    }

    FormattedContext { text, served_chars, bullet_ids, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kg_core::BulletKind;

    fn bullet(id: &str, slug: &str, text: &str) -> Bullet {
        Bullet {
            id: id.to_string(),
            slug: slug.to_string(),
            text: text.to_string(),
            kind: BulletKind::Fact,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tombstoned: false,
        }
    }

    #[test]
    fn groups_by_node_and_lists_explore_hint() {
        let candidates = vec![
            RankedBullet { bullet: bullet("b-1", "alpha", "first"), score: 0.9 },
            RankedBullet { bullet: bullet("b-2", "alpha", "second"), score: 0.8 },
        ];
        let out = format_context(&candidates, 10_000, |_| false, |_| vec!["beta".into()]);
        assert!(out.text.contains("## Alpha (alpha)"));
        assert!(out.text.contains("- first"));
        assert!(out.text.contains("- second"));
        assert!(out.text.contains("Explore: beta"));
        assert_eq!(out.bullet_ids, vec!["b-1".to_string(), "b-2".to_string()]);
        assert!(!out.truncated);
    }

    #[test]
    fn flagged_node_gets_warning_marker() {
        let candidates = vec![RankedBullet { bullet: bullet("b-1", "alpha", "x"), score: 0.5 }];
        let out = format_context(&candidates, 10_000, |_| true, |_| Vec::new());
        assert!(out.text.contains('\u{26A0}'));
    }

    #[test]
    fn bullets_within_a_node_are_insertion_ordered_not_score_ordered() {
        let mut older = bullet("b-2", "alpha", "older");
        older.created_at = Utc::now() - chrono::Duration::seconds(10);
        let newer = bullet("b-1", "alpha", "newer");
        // Higher score first in input, but older bullet should render first.
        let candidates = vec![
            RankedBullet { bullet: newer, score: 0.9 },
            RankedBullet { bullet: older, score: 0.1 },
        ];
        let out = format_context(&candidates, 10_000, |_| false, |_| Vec::new());
        let older_pos = out.text.find("older").unwrap();
        let newer_pos = out.text.find("newer").unwrap();
        assert!(older_pos < newer_pos);
    }

    #[test]
    fn char_budget_truncates_and_reports_it() {
        let candidates = vec![
            RankedBullet { bullet: bullet("b-1", "alpha", "short"), score: 0.9 },
            RankedBullet { bullet: bullet("b-2", "beta", "another one"), score: 0.8 },
        ];
        let out = format_context(&candidates, 30, |_| false, |_| Vec::new());
        assert!(out.truncated);
        assert!(out.text.chars().count() <= 30 + "## Beta (beta)\n".len());
    }

    #[test]
    fn served_chars_sums_bullet_lengths_per_node() {
        let candidates = vec![
            RankedBullet { bullet: bullet("b-1", "alpha", "abc"), score: 0.9 },
            RankedBullet { bullet: bullet("b-2", "alpha", "de"), score: 0.8 },
        ];
        let out = format_context(&candidates, 10_000, |_| false, |_| Vec::new());
        assert_eq!(out.served_chars, vec![("alpha".to_string(), 5)]);
    }
}
