//! Data model: `Node`, `Bullet`, `NodeMeta`, `Backlink`, `Embedding`.
//!
//! These types describe the *live view* projected from records; they carry
//! no I/O themselves. `kg-store` replays record logs into them, `kg-index`
//! projects them into the derived store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node slug: `[a-z0-9][a-z0-9-]*`.
pub fn is_valid_slug(slug: &str) -> bool {
    let mut chars = slug.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Synthetic node slug prefixes that carry no human author.
pub const SYNTHETIC_PREFIXES: [&str; 2] = ["_fleeting-", "_doc-"];

/// Whether `slug` names a synthetic node (file-source or fleeting scratch node).
pub fn is_synthetic_slug(slug: &str) -> bool {
    SYNTHETIC_PREFIXES.iter().any(|p| slug.starts_with(p))
}

/// The kind tag attached to a bullet at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletKind {
    Fact,
    Gotcha,
    Decision,
    Task,
    Note,
    Success,
    Failure,
}

impl BulletKind {
    /// All kinds, in the order spec.md §3 lists them.
    pub const ALL: [BulletKind; 7] = [
        BulletKind::Fact,
        BulletKind::Gotcha,
        BulletKind::Decision,
        BulletKind::Task,
        BulletKind::Note,
        BulletKind::Success,
        BulletKind::Failure,
    ];

    /// Parse a kind from its lowercase wire name.
    pub fn parse(s: &str) -> Option<BulletKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// The lowercase wire name, matching `#[serde(rename_all = "snake_case")]`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulletKind::Fact => "fact",
            BulletKind::Gotcha => "gotcha",
            BulletKind::Decision => "decision",
            BulletKind::Task => "task",
            BulletKind::Note => "note",
            BulletKind::Success => "success",
            BulletKind::Failure => "failure",
        }
    }
}

impl fmt::Display for BulletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for BulletKind {
    fn default() -> Self {
        BulletKind::Note
    }
}

/// An atomic text record: the live, materialized view of a bullet after
/// replaying its node's record log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    /// Stable ID, globally unique, stable across edits.
    pub id: String,
    /// The node this bullet belongs to.
    pub slug: String,
    /// Current text. Mutated in place (logically) by `update` records.
    pub text: String,
    /// The kind tag assigned at creation.
    pub kind: BulletKind,
    /// Creation timestamp (first `add` record).
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Last-update timestamp (most recent `add`/`update` record for this id).
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Set once a `delete` record is seen for this id. A tombstoned id never
    /// becomes live again.
    pub tombstoned: bool,
}

impl Bullet {
    /// Character length of `text`, used by the budget accountant.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A directed edge `(from_bullet_id, to_slug)` extracted from `[[to-slug]]`
/// or `[to-slug]` tokens in bullet text. Derived only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    pub from_bullet_id: String,
    pub to_slug: String,
}

/// Per-bullet vote tally accumulated from `vote` meta records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub useful: u32,
    pub harmful: u32,
}

/// Per-node counters materialized from the meta log.
///
/// `served_budget` is intentionally *not* reset by a plain reindex — only a
/// `reviewed` record zeroes it. `kg-store::replay` therefore
/// tracks it separately from the rest of `NodeMeta`, which is a pure
/// function of the meta log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Accumulated served-character budget for this node.
    pub served_budget: u64,
    /// Timestamp of the most recent `reviewed` record, if any.
    pub cleared_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Vote tallies keyed by bullet id.
    pub votes: std::collections::BTreeMap<String, VoteTally>,
}

/// A node: a named, append-only group of bullets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub slug: String,
    pub bullets: Vec<Bullet>,
    pub meta: NodeMeta,
}

impl Node {
    /// Bullets that are not tombstoned, in first-appearance order.
    pub fn live_bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.iter().filter(|b| !b.tombstoned)
    }

    pub fn live_bullet_count(&self) -> usize {
        self.live_bullets().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("alpha"));
        assert!(is_valid_slug("a1-b2"));
        assert!(is_valid_slug("9x"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-abc"));
        assert!(!is_valid_slug("Abc"));
        assert!(!is_valid_slug("a_b"));
    }

    #[test]
    fn synthetic_slug_detection() {
        assert!(is_synthetic_slug("_doc-readme"));
        assert!(is_synthetic_slug("_fleeting-2026"));
        assert!(!is_synthetic_slug("regular-node"));
    }

    #[test]
    fn bullet_kind_roundtrip() {
        for kind in BulletKind::ALL {
            assert_eq!(BulletKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BulletKind::parse("nonsense"), None);
    }
}
