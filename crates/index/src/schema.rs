//! Schema versioning: "a monotonically increasing schema
//! version is persisted. On startup, mismatched versions trigger a
//! drop-and-rebuild from records; this is the only 'upgrade' path."

use kg_core::KgResult;
use std::path::{Path, PathBuf};

/// Current on-disk schema version for the derived store. Bump this when the
/// persisted `graph.db` format changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

fn version_path(index_dir: &Path) -> PathBuf {
    index_dir.join("schema_version")
}

/// Read the stored schema version, if any. Absence means "never
/// initialized", which callers treat the same as a stale version — the
/// rebuild path is also the initialization path.
pub fn read_version(index_dir: &Path) -> Option<u32> {
    std::fs::read_to_string(version_path(index_dir))
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

pub fn write_version(index_dir: &Path, version: u32) -> KgResult<()> {
    std::fs::create_dir_all(index_dir)?;
    std::fs::write(version_path(index_dir), version.to_string())?;
    Ok(())
}

/// Whether a drop-and-rebuild is needed: the stored version is missing or
/// older than [`SCHEMA_VERSION`]. A stored version *newer* than this binary
/// knows about is left alone — downgrading isn't a supported path, but it
/// isn't this function's job to refuse to start either.
pub fn needs_rebuild(index_dir: &Path) -> bool {
    match read_version(index_dir) {
        Some(v) => v < SCHEMA_VERSION,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_version_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        assert!(needs_rebuild(dir.path()));
    }

    #[test]
    fn current_version_does_not_need_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_version(dir.path(), SCHEMA_VERSION).unwrap();
        assert!(!needs_rebuild(dir.path()));
    }

    #[test]
    fn older_version_needs_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        write_version(dir.path(), 0).unwrap();
        assert!(needs_rebuild(dir.path()));
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        write_version(dir.path(), 7).unwrap();
        assert_eq!(read_version(dir.path()), Some(7));
    }
}
