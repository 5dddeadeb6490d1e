//! Content-addressed embedding cache: "a local content-addressed
//! cache maps `(model_id, hash(text)) -> vector`, survives process restarts,
//! and is shared across projects".

use kg_core::hash::hash_hex;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One cached row, persisted as a single JSON line per `(model_id, hash)`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct CacheRow {
    model_id: String,
    hash: String,
    vector: Vec<f32>,
}

/// An on-disk, process-shared embedding cache. The cache directory is
/// independent of any one project's root — callers typically point it at a user-level cache dir.
pub struct EmbeddingCache {
    dir: PathBuf,
    memo: Mutex<HashMap<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(EmbeddingCache {
            dir,
            memo: Mutex::new(HashMap::new()),
        })
    }

    fn file_for(&self, model_id: &str) -> PathBuf {
        let safe_model = model_id.replace([':', '/'], "_");
        self.dir.join(format!("{safe_model}.jsonl"))
    }

    /// Look up a cached vector for `text` under `model_id`. Checks the
    /// in-process memo table first, then scans the on-disk file (a content
    /// hash match is an exact-text match by construction).
    pub fn get(&self, model_id: &str, text: &str) -> Option<Vec<f32>> {
        let hash = hash_hex(text);
        let key = (model_id.to_string(), hash.clone());
        if let Some(v) = self.memo.lock().get(&key) {
            return Some(v.clone());
        }
        let path = self.file_for(model_id);
        let contents = std::fs::read_to_string(&path).ok()?;
        for line in contents.lines() {
            if let Ok(row) = serde_json::from_str::<CacheRow>(line) {
                if row.hash == hash {
                    self.memo.lock().insert(key, row.vector.clone());
                    return Some(row.vector);
                }
            }
        }
        None
    }

    /// Persist a freshly computed vector, appending to the per-model cache
    /// file and updating the in-process memo table.
    pub fn put(&self, model_id: &str, text: &str, vector: Vec<f32>) -> std::io::Result<()> {
        let hash = hash_hex(text);
        let row = CacheRow {
            model_id: model_id.to_string(),
            hash: hash.clone(),
            vector: vector.clone(),
        };
        let line = serde_json::to_string(&row)?;
        let path = self.file_for(model_id);
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        self.memo.lock().insert((model_id.to_string(), hash), vector);
        Ok(())
    }

    /// Default shared cache location: a user-level directory rather than
    /// a project-local one, so the cache survives across projects using
    /// the same embedding model.
    pub fn default_dir() -> PathBuf {
        dirs_cache_dir().join("kg").join("embeddings")
    }
}

fn dirs_cache_dir() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| Path::new(&h).join(".cache")))
        .unwrap_or_else(|| PathBuf::from(".cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        cache.put("local:on-device", "hello", vec![1.0, 2.0]).unwrap();
        assert_eq!(cache.get("local:on-device", "hello"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn miss_for_unknown_text() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        assert_eq!(cache.get("local:on-device", "never seen"), None);
    }

    #[test]
    fn survives_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = EmbeddingCache::open(dir.path()).unwrap();
            cache.put("m", "text", vec![0.5]).unwrap();
        }
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        assert_eq!(cache.get("m", "text"), Some(vec![0.5]));
    }

    #[test]
    fn different_model_ids_dont_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        cache.put("model-a", "text", vec![1.0]).unwrap();
        assert_eq!(cache.get("model-b", "text"), None);
    }
}
