//! The indexer: projects record-store state into the
//! keyword index, backlinks table, and embedding table, single-writer
//! against the derived store.

use crate::backlinks::extract_backlinks;
use crate::budget::BudgetAccountant;
use crate::schema;
use kg_core::{Backlink, KgResult};
use kg_search::{InvertedIndex, ScoredHit};
use kg_store::RecordStore;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A vector row stored in the embedding table, keyed by `bullet_id`
///.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingRow {
    pub vector: Vec<f32>,
    pub dim: usize,
    pub content_hash: String,
    pub model_id: String,
}

/// A bullet whose stored embedding is missing or stale (its `content_hash`
/// doesn't match the current text, or no row exists yet). `reindex_node`
/// returns these so the watcher can hand them to the embedding queue off
/// its own critical path.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEmbed {
    pub bullet_id: String,
    pub text: String,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct PersistedEmbeddings {
    model_id: String,
    rows: HashMap<String, EmbeddingRow>,
}

/// Table of `(from_bullet_id, to_slug)` edges plus the reverse index used
/// for the ranker's "Explore" hint.
#[derive(Default)]
struct BacklinksTable {
    by_bullet: HashMap<String, Vec<Backlink>>,
    /// to_slug -> distinct slugs of the bullets linking to it.
    incoming: HashMap<String, BTreeSet<String>>,
}

impl BacklinksTable {
    fn remove_bullet(&mut self, bullet_id: &str, from_slug: &str) {
        if let Some(links) = self.by_bullet.remove(bullet_id) {
            for link in links {
                if let Some(set) = self.incoming.get_mut(&link.to_slug) {
                    set.remove(from_slug);
                }
            }
        }
    }

    fn upsert_bullet(&mut self, bullet_id: &str, from_slug: &str, links: Vec<Backlink>) {
        self.remove_bullet(bullet_id, from_slug);
        for link in &links {
            self.incoming
                .entry(link.to_slug.clone())
                .or_default()
                .insert(from_slug.to_string());
        }
        self.by_bullet.insert(bullet_id.to_string(), links);
    }

    fn incoming_slugs(&self, slug: &str, limit: usize) -> Vec<String> {
        self.incoming
            .get(slug)
            .map(|set| set.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

/// The derived store: single-writer keyword index, backlinks table,
/// embedding table, and budget accountant, rebuilt from `RecordStore` on
/// open or on schema mismatch.
pub struct DerivedStore {
    index_dir: PathBuf,
    keyword: RwLock<InvertedIndex>,
    backlinks: RwLock<BacklinksTable>,
    embeddings: RwLock<PersistedEmbeddings>,
    /// bullet ids this process has indexed per slug, used to detect
    /// removals (tombstoned or otherwise gone) on the next `reindex_node`.
    indexed_bullets: RwLock<HashMap<String, HashSet<String>>>,
    pub budget: BudgetAccountant,
    /// Bullets touched since the last calibration pass, for the watcher's
    /// `auto_calibrate_threshold` counter. Owned here rather
    /// than by `kg-watcher` because it's a property of the derived store's
    /// staleness, which `kg-ranker` also needs to read at query time.
    touched: std::sync::atomic::AtomicU64,
}

impl DerivedStore {
    /// Open (or initialize) the derived store at `<root>/index/`. On a
    /// schema-version mismatch, the keyword index and backlinks table are
    /// rebuilt from `store`; the embedding table and budget
    /// counters are not records-derived so they survive untouched — see
    /// DESIGN.md.
    pub fn open(root: &Path, store: &RecordStore, model_id: &str) -> KgResult<Self> {
        let index_dir = kg_store::paths::index_dir(root);
        std::fs::create_dir_all(&index_dir)?;

        let embeddings = load_embeddings(&index_dir, model_id)?;
        let budget = BudgetAccountant::open(&index_dir)?;

        let derived = DerivedStore {
            index_dir,
            keyword: RwLock::new(InvertedIndex::new()),
            backlinks: RwLock::new(BacklinksTable::default()),
            embeddings: RwLock::new(embeddings),
            indexed_bullets: RwLock::new(HashMap::new()),
            budget,
            touched: std::sync::atomic::AtomicU64::new(0),
        };

        if schema::needs_rebuild(&derived.index_dir) {
            tracing::info!("schema rebuild: reindexing all nodes from records");
            derived.reindex_all(store)?;
            schema::write_version(&derived.index_dir, schema::SCHEMA_VERSION)?;
        } else {
            derived.reindex_all(store)?;
        }

        Ok(derived)
    }

    /// `reindex_node(slug)`: read the node's logs, compute
    /// the live bullet set, diff against the stored set, and emit minimal
    /// upserts/deletes into the keyword index, backlinks table, and
    /// pending-embedding list.
    pub fn reindex_node(&self, store: &RecordStore, slug: &str) -> KgResult<Vec<PendingEmbed>> {
        let bullets = store.list(slug)?;
        let live_ids: HashSet<String> = bullets.iter().map(|b| b.id.clone()).collect();

        let previously_indexed = self
            .indexed_bullets
            .read()
            .get(slug)
            .cloned()
            .unwrap_or_default();
        let removed: Vec<String> = previously_indexed.difference(&live_ids).cloned().collect();

        let mut pending = Vec::new();
        {
            let mut keyword = self.keyword.write();
            let mut backlinks = self.backlinks.write();
            let mut embeddings = self.embeddings.write();

            for bullet_id in &removed {
                keyword.remove(bullet_id);
                backlinks.remove_bullet(bullet_id, slug);
                embeddings.rows.remove(bullet_id);
            }

            for bullet in &bullets {
                let ts_micros = bullet.updated_at.timestamp_micros().max(0) as u64;
                keyword.upsert(&bullet.id, slug, &bullet.text, ts_micros);

                let links = extract_backlinks(&bullet.id, &bullet.text);
                backlinks.upsert_bullet(&bullet.id, slug, links);

                let hash = hash_hex_for(&bullet.text);
                let stale = match embeddings.rows.get(&bullet.id) {
                    Some(row) => row.content_hash != hash || row.model_id != embeddings.model_id,
                    None => true,
                };
                if stale {
                    pending.push(PendingEmbed {
                        bullet_id: bullet.id.clone(),
                        text: bullet.text.clone(),
                    });
                }
            }
        }

        self.indexed_bullets.write().insert(slug.to_string(), live_ids);
        persist_embeddings(&self.index_dir, &self.embeddings.read())?;
        self.record_touch((removed.len() + pending.len()) as u64);
        Ok(pending)
    }

    /// `reindex_all()`: walk every node; drop and rebuild
    /// all derived tables inside one write pass.
    pub fn reindex_all(&self, store: &RecordStore) -> KgResult<Vec<PendingEmbed>> {
        *self.keyword.write() = InvertedIndex::new();
        *self.backlinks.write() = BacklinksTable::default();
        self.indexed_bullets.write().clear();

        let mut pending = Vec::new();
        for slug in store.list_slugs()? {
            pending.extend(self.reindex_node(store, &slug)?);
        }
        // A full rebuild isn't organic drift; don't let it look like one.
        self.reset_touch_counter();
        Ok(pending)
    }

    /// Store a freshly computed embedding for `bullet_id` under the
    /// currently configured model.
    pub fn store_embedding(&self, bullet_id: &str, vector: Vec<f32>, text: &str) -> KgResult<()> {
        let dim = vector.len();
        let model_id = self.embeddings.read().model_id.clone();
        self.embeddings.write().rows.insert(
            bullet_id.to_string(),
            EmbeddingRow {
                vector,
                dim,
                content_hash: hash_hex_for(text),
                model_id,
            },
        );
        persist_embeddings(&self.index_dir, &self.embeddings.read())
    }

    /// Drop a bullet's embedding row, e.g. after a provider gives up and
    /// the bullet is recorded as unembedded.
    pub fn clear_embedding(&self, bullet_id: &str) -> KgResult<()> {
        self.embeddings.write().rows.remove(bullet_id);
        persist_embeddings(&self.index_dir, &self.embeddings.read())
    }

    /// All `(bullet_id, vector)` rows, for loading the vector server at
    /// start or on reload.
    pub fn embedding_rows(&self) -> Vec<(String, Vec<f32>)> {
        self.embeddings
            .read()
            .rows
            .iter()
            .map(|(id, row)| (id.clone(), row.vector.clone()))
            .collect()
    }

    /// Change the configured embedding model. Existing rows are not
    /// eagerly recomputed; the next `reindex_node` for a bullet notices
    /// the `model_id` mismatch and emits a fresh `PendingEmbed`.
    pub fn set_model_id(&self, model_id: &str) -> KgResult<()> {
        self.embeddings.write().model_id = model_id.to_string();
        persist_embeddings(&self.index_dir, &self.embeddings.read())
    }

    pub fn search_keyword(&self, query: &str, limit: usize) -> Vec<ScoredHit> {
        self.keyword.read().search(query, limit)
    }

    /// The owning slug of an indexed bullet (used by `kg-ranker` to fetch
    /// the full `Bullet` from the record store for formatting and
    /// reranking candidates returned by either channel).
    pub fn slug_of(&self, bullet_id: &str) -> Option<String> {
        self.keyword.read().slug_of(bullet_id).map(String::from)
    }

    /// Backlinked slugs for the "Explore" hint,
    /// capped at `limit`.
    pub fn backlinked_slugs(&self, slug: &str, limit: usize) -> Vec<String> {
        self.backlinks.read().incoming_slugs(slug, limit)
    }

    /// Total live bullets currently indexed, the denominator for the
    /// `auto_calibrate_threshold` fraction.
    pub fn total_documents(&self) -> usize {
        self.keyword.read().len()
    }

    /// Record that `count` bullets changed in a reindex pass.
    pub fn record_touch(&self, count: u64) {
        self.touched.fetch_add(count, std::sync::atomic::Ordering::Relaxed);
    }

    /// Whether the touched fraction (touched / total_documents) exceeds
    /// `threshold` — the watcher's cue that the next query should trigger
    /// recalibration.
    pub fn calibration_due(&self, threshold: f32) -> bool {
        let total = self.total_documents();
        if total == 0 {
            return false;
        }
        let touched = self.touched.load(std::sync::atomic::Ordering::Relaxed);
        (touched as f32 / total as f32) > threshold
    }

    /// Reset the touched counter after a calibration pass completes.
    pub fn reset_touch_counter(&self) {
        self.touched.store(0, std::sync::atomic::Ordering::Relaxed);
    }
}

fn hash_hex_for(text: &str) -> String {
    kg_core::hash::hash_hex(text)
}

fn load_embeddings(index_dir: &Path, model_id: &str) -> KgResult<PersistedEmbeddings> {
    let path = index_dir.join("embeddings.json");
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let mut parsed: PersistedEmbeddings = serde_json::from_str(&contents)?;
            if parsed.model_id.is_empty() {
                parsed.model_id = model_id.to_string();
            }
            Ok(parsed)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedEmbeddings {
            model_id: model_id.to_string(),
            rows: HashMap::new(),
        }),
        Err(e) => Err(e.into()),
    }
}

fn persist_embeddings(index_dir: &Path, embeddings: &PersistedEmbeddings) -> KgResult<()> {
    let path = index_dir.join("embeddings.json");
    let contents = serde_json::to_string(embeddings)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_core::BulletKind;

    #[test]
    fn reindex_node_indexes_bullets_and_backlinks() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "alpha [b-link] beta", BulletKind::Fact).unwrap();

        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        let hits = derived.search_keyword("alpha", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(derived.backlinked_slugs("b-link", 5), vec!["t".to_string()]);
    }

    #[test]
    fn reindex_node_emits_pending_embed_for_new_bullet() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "hello", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        // reindex_all already ran during open(); a subsequent reindex_node
        // with no changes emits nothing new.
        let pending = derived.reindex_node(&store, "t").unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn store_embedding_clears_pending_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "hello", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        derived.store_embedding(&id, vec![1.0, 0.0], "hello").unwrap();
        let rows = derived.embedding_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, id);
    }

    #[test]
    fn editing_text_marks_embedding_stale_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "hello", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        derived.store_embedding(&id, vec![1.0, 0.0], "hello").unwrap();

        store.update(&id, "goodbye").unwrap();
        let pending = derived.reindex_node(&store, "t").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].bullet_id, id);
    }

    #[test]
    fn deleting_a_bullet_removes_its_embedding_and_postings() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "alpha", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        derived.store_embedding(&id, vec![1.0], "alpha").unwrap();

        store.delete(&id).unwrap();
        derived.reindex_node(&store, "t").unwrap();

        assert!(derived.search_keyword("alpha", 10).is_empty());
        assert!(derived.embedding_rows().is_empty());
    }

    #[test]
    fn scenario_two_embedding_removed_on_next_reindex() {
        // spec.md §8 scenario 2: add; update; delete -> list empty, search
        // empty, embedding row removed on next reindex.
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "x", BulletKind::Note).unwrap();
        store.update(&id, "y").unwrap();
        store.delete(&id).unwrap();

        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        assert!(store.list("t").unwrap().is_empty());
        assert!(derived.search_keyword("y", 10).is_empty());
        assert!(derived.embedding_rows().is_empty());
    }

    #[test]
    fn model_change_invalidates_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let id = store.add("t", "hello", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        derived.store_embedding(&id, vec![1.0], "hello").unwrap();

        derived.set_model_id("remote_a:text-embedding-3-small").unwrap();
        let pending = derived.reindex_node(&store, "t").unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn idempotent_reindex_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "alpha beta", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        let first = derived.search_keyword("alpha", 10);
        derived.reindex_node(&store, "t").unwrap();
        let second = derived.search_keyword("alpha", 10);
        assert_eq!(first, second);
    }

    #[test]
    fn editing_a_bullet_counts_toward_calibration_due() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        let a = store.add("t", "alpha", BulletKind::Note).unwrap();
        store.add("t", "beta", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        // reindex_all inside open() resets the counter; a fresh store is never due.
        assert!(!derived.calibration_due(0.01));

        store.update(&a, "alpha updated").unwrap();
        derived.reindex_node(&store, "t").unwrap();
        // 1 touched / 2 documents = 0.5, above a low threshold...
        assert!(derived.calibration_due(0.1));
        // ...but not above a threshold it doesn't clear.
        assert!(!derived.calibration_due(0.9));

        derived.reset_touch_counter();
        assert!(!derived.calibration_due(0.1));
    }

    #[test]
    fn full_rebuild_does_not_look_like_organic_drift() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path()).unwrap();
        store.add("t", "alpha", BulletKind::Note).unwrap();
        let derived = DerivedStore::open(dir.path(), &store, "local:on-device").unwrap();
        derived.reindex_all(&store).unwrap();
        assert!(!derived.calibration_due(0.0001));
    }
}
