//! The record store: `add`/`update`/`delete`/`list` over
//! per-node append-only logs, plus `vote`/`mark_reviewed` against the
//! sibling meta log.

use crate::log::append_line;
use crate::paths::{meta_log_path, node_log_path, nodes_dir};
use crate::replay::replay_node;
use chrono::Utc;
use dashmap::DashMap;
use kg_core::{model::is_valid_slug, ids, Bullet, BulletKind, BulletRecord, KgError, KgResult, MetaRecord, VoteSign};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Owns the on-disk `nodes/` tree under a project root and serializes
/// writes to each node's logs with a process-local advisory lock
///.
pub struct RecordStore {
    root: PathBuf,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Best-effort cache of bullet id -> owning slug, populated as this
    /// process observes adds and lookups. A cache miss falls back to a full
    /// scan of `nodes/`, so correctness never depends on the cache being warm.
    id_index: DashMap<String, String>,
}

impl RecordStore {
    /// Open (or create) the record store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> KgResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(nodes_dir(&root))?;
        Ok(RecordStore {
            root,
            write_locks: DashMap::new(),
            id_index: DashMap::new(),
        })
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn lock_for(&self, slug: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(slug.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// `add(slug, text, kind) -> bullet_id`. Creates the
    /// node implicitly on first bullet (idempotent: re-adding to an
    /// existing slug is just another append).
    pub fn add(&self, slug: &str, text: &str, kind: BulletKind) -> KgResult<String> {
        if !is_valid_slug(slug) {
            return Err(KgError::input(format!("invalid slug: {slug}")));
        }
        let lock = self.lock_for(slug);
        let _guard = lock.lock();

        // Hold the lock across replay-for-collision-check + append so no
        // concurrent add in this process can mint the same id.
        let node = replay_node(&self.root, slug)?;
        let live: std::collections::HashSet<&str> =
            node.bullets.iter().map(|b| b.id.as_str()).collect();
        let id = ids::generate_unique(|candidate| live.contains(candidate));

        let record = BulletRecord::Add {
            id: id.clone(),
            text: text.to_string(),
            kind,
            ts: Utc::now(),
        };
        self.append_bullet_record(slug, &record)?;
        self.id_index.insert(id.clone(), slug.to_string());
        Ok(id)
    }

    /// `update(id, text)`. `NotFound` if `id` is unknown in
    /// any node.
    pub fn update(&self, id: &str, text: &str) -> KgResult<()> {
        let slug = self.find_owning_slug(id)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock();
        let record = BulletRecord::Update {
            id: id.to_string(),
            text: text.to_string(),
            ts: Utc::now(),
        };
        self.append_bullet_record(&slug, &record)
    }

    /// `delete(id)`: tombstone, never physically removed.
    pub fn delete(&self, id: &str) -> KgResult<()> {
        let slug = self.find_owning_slug(id)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock();
        let record = BulletRecord::Delete {
            id: id.to_string(),
            ts: Utc::now(),
        };
        self.append_bullet_record(&slug, &record)
    }

    /// `list(slug) -> [Bullet]`: the live, non-tombstoned
    /// view, in first-appearance order.
    pub fn list(&self, slug: &str) -> KgResult<Vec<Bullet>> {
        Ok(replay_node(&self.root, slug)?
            .live_bullets()
            .cloned()
            .collect())
    }

    /// Cast a vote on a bullet, appended to its node's meta log.
    pub fn vote(&self, id: &str, sign: VoteSign) -> KgResult<()> {
        let slug = self.find_owning_slug(id)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock();
        let record = MetaRecord::Vote {
            target_id: id.to_string(),
            sign,
            ts: Utc::now(),
        };
        self.append_meta_record(&slug, &record)
    }

    /// `mark_reviewed(slug)`: append a `reviewed` record, resetting that
    /// node's served-budget counter — the actual counter
    /// reset happens in `kg-index::budget` when it next observes this
    /// record; this method only emits it.
    pub fn mark_reviewed(&self, slug: &str) -> KgResult<()> {
        if !is_valid_slug(slug) {
            return Err(KgError::input(format!("invalid slug: {slug}")));
        }
        let lock = self.lock_for(slug);
        let _guard = lock.lock();
        let record = MetaRecord::Reviewed { ts: Utc::now() };
        self.append_meta_record(slug, &record)
    }

    /// All node slugs with a non-empty `nodes/<slug>/` directory.
    pub fn list_slugs(&self) -> KgResult<Vec<String>> {
        let dir = nodes_dir(&self.root);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut slugs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    slugs.push(name.to_string());
                }
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Appends a bullet record. Callers must already hold this slug's lock
    /// (via `lock_for(slug).lock()`) — `append_line` doesn't lock itself, so
    /// calling this without the lock held would race concurrent writers.
    fn append_bullet_record(&self, slug: &str, record: &BulletRecord) -> KgResult<()> {
        let line = serde_json::to_string(record)?;
        append_line(&node_log_path(&self.root, slug), &line)?;
        Ok(())
    }

    /// Appends a meta record. Same locking precondition as
    /// `append_bullet_record`.
    fn append_meta_record(&self, slug: &str, record: &MetaRecord) -> KgResult<()> {
        let line = serde_json::to_string(record)?;
        append_line(&meta_log_path(&self.root, slug), &line)?;
        Ok(())
    }

    /// Resolve a bullet id to its owning slug, checking the in-process
    /// cache first and falling back to a scan of every node's log.
    fn find_owning_slug(&self, id: &str) -> KgResult<String> {
        if let Some(slug) = self.id_index.get(id) {
            return Ok(slug.clone());
        }
        for slug in self.list_slugs()? {
            let node = replay_node(&self.root, &slug)?;
            if node.bullets.iter().any(|b| b.id == id) {
                self.id_index.insert(id.to_string(), slug.clone());
                return Ok(slug);
            }
        }
        Err(KgError::input(format!("bullet not found: {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "alpha [b-link] beta", BulletKind::Fact).unwrap();
        let bullets = store.list("t").unwrap();
        assert_eq!(bullets.len(), 1);
        assert_eq!(bullets[0].id, id);
        assert_eq!(bullets[0].text, "alpha [b-link] beta");
    }

    #[test]
    fn update_unknown_id_fails_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let err = store.update("b-nonexist", "x").unwrap_err();
        assert!(matches!(err, KgError::InputError(_)));
    }

    #[test]
    fn add_update_delete_then_list_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "x", BulletKind::Note).unwrap();
        store.update(&id, "y").unwrap();
        store.delete(&id).unwrap();
        assert!(store.list("t").unwrap().is_empty());
    }

    #[test]
    fn mark_reviewed_appends_to_meta_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "x", BulletKind::Note).unwrap();
        store.mark_reviewed("t").unwrap();
        let meta = crate::replay::replay_meta(dir.path(), "t").unwrap();
        assert!(meta.cleared_at.is_some());
    }

    #[test]
    fn implicit_node_creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "a", BulletKind::Note).unwrap();
        store.add("t", "b", BulletKind::Note).unwrap();
        assert_eq!(store.list("t").unwrap().len(), 2);
        assert_eq!(store.list_slugs().unwrap(), vec!["t".to_string()]);
    }

    #[test]
    fn rejects_invalid_slug() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let err = store.add("Invalid_Slug", "x", BulletKind::Note).unwrap_err();
        assert!(matches!(err, KgError::InputError(_)));
    }
}
