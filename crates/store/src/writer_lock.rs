//! Cross-process writer lock.
//!
//! A plain exclusive-create lockfile at `<root>/index/writer.lock`: the
//! watcher process holds it for its lifetime, `kg-executor`'s `serve`
//! command fails fast with `WriterConflict` if one is already running
//! rather than silently running two writers against the same derived
//! store.

use kg_core::{KgError, KgResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A held writer lock. Removes its lockfile on drop.
pub struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    /// Acquire the writer lock for `root`'s derived store. Fails with
    /// [`KgError::WriterConflict`] if another process already holds it.
    pub fn acquire(root: &Path) -> KgResult<WriterLock> {
        let index_dir = crate::paths::index_dir(root);
        std::fs::create_dir_all(&index_dir)?;
        let path = index_dir.join("writer.lock");

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    KgError::WriterConflict(path.clone())
                } else {
                    KgError::Io(e)
                }
            })?;
        let _ = write!(file, "{}", std::process::id());
        Ok(WriterLock { path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let lock = WriterLock::acquire(dir.path()).unwrap();
        let err = WriterLock::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, KgError::WriterConflict(_)));
        drop(lock);
    }

    #[test]
    fn dropping_releases_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = WriterLock::acquire(dir.path()).unwrap();
        drop(lock);
        assert!(WriterLock::acquire(dir.path()).is_ok());
    }
}
