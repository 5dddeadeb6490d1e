//! Budget accountant: accrue served character counts per
//! node, flag nodes whose ratio exceeds a threshold, reset on review.
//!
//! `served_budget` is persisted in its own small JSON table rather than
//! derived from the record logs — nothing in the record format carries
//! "this node was served N characters", so unlike the keyword index and
//! backlinks table this state cannot be rebuilt by replaying records. It
//! survives `reindex_node`/`reindex_all` and a schema-version rebuild;
//! only a `reviewed` record zeroes it.

use kg_core::model::is_synthetic_slug;
use kg_core::KgResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-node served-character accrual, persisted at `<index_dir>/budget.json`.
pub struct BudgetAccountant {
    path: PathBuf,
    counters: RwLock<BTreeMap<String, u64>>,
}

impl BudgetAccountant {
    /// Load counters from `<index_dir>/budget.json`, or start empty if the
    /// file doesn't exist yet.
    pub fn open(index_dir: &Path) -> KgResult<Self> {
        let path = index_dir.join("budget.json");
        let counters = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(BudgetAccountant {
            path,
            counters: RwLock::new(counters),
        })
    }

    fn persist(&self) -> KgResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&*self.counters.read())?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// `node.served_budget += sum(chars(bullets))` for every node that
    /// contributed to a served context.
    pub fn accrue(&self, slug: &str, chars: u64) -> KgResult<()> {
        {
            let mut counters = self.counters.write();
            *counters.entry(slug.to_string()).or_insert(0) += chars;
        }
        self.persist()
    }

    pub fn served_budget(&self, slug: &str) -> u64 {
        self.counters.read().get(slug).copied().unwrap_or(0)
    }

    /// Whether `slug` should be flagged for review: `served_budget /
    /// live_bullet_count > threshold`. Synthetic nodes (`_fleeting-*`,
    /// `_doc-*`) are never flagged — they have no human author to act on
    /// the flag.
    pub fn is_flagged(&self, slug: &str, live_bullet_count: usize, threshold: u64) -> bool {
        if is_synthetic_slug(slug) || live_bullet_count == 0 {
            return false;
        }
        self.served_budget(slug) / live_bullet_count as u64 > threshold
    }

    /// `mark_reviewed(slug)`: reset the counter to zero.
    pub fn mark_reviewed(&self, slug: &str) -> KgResult<()> {
        {
            let mut counters = self.counters.write();
            counters.insert(slug.to_string(), 0);
        }
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accrue_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let acc = BudgetAccountant::open(dir.path()).unwrap();
        acc.accrue("t", 100).unwrap();
        acc.accrue("t", 50).unwrap();
        assert_eq!(acc.served_budget("t"), 150);
    }

    #[test]
    fn scenario_six_from_spec() {
        // spec.md §8 scenario 6: 3 bullets, served_budget=10000,
        // threshold=3000 -> flagged; after mark_reviewed, not flagged.
        let dir = tempfile::tempdir().unwrap();
        let acc = BudgetAccountant::open(dir.path()).unwrap();
        acc.accrue("t", 10_000).unwrap();
        assert!(acc.is_flagged("t", 3, 3000));
        acc.mark_reviewed("t").unwrap();
        assert!(!acc.is_flagged("t", 3, 3000));
    }

    #[test]
    fn synthetic_nodes_are_never_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let acc = BudgetAccountant::open(dir.path()).unwrap();
        acc.accrue("_doc-readme", 1_000_000).unwrap();
        assert!(!acc.is_flagged("_doc-readme", 1, 10));
        acc.accrue("_fleeting-2026", 1_000_000).unwrap();
        assert!(!acc.is_flagged("_fleeting-2026", 1, 10));
    }

    #[test]
    fn counters_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let acc = BudgetAccountant::open(dir.path()).unwrap();
            acc.accrue("t", 42).unwrap();
        }
        let reopened = BudgetAccountant::open(dir.path()).unwrap();
        assert_eq!(reopened.served_budget("t"), 42);
    }

    #[test]
    fn zero_live_bullets_is_never_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let acc = BudgetAccountant::open(dir.path()).unwrap();
        acc.accrue("t", 10_000).unwrap();
        assert!(!acc.is_flagged("t", 0, 1));
    }
}
