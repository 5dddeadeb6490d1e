//! Append-only line writer.
//!
//! Grounded in the teacher's `durability::wal::writer::WalWriter`, generalized
//! from a binary WAL-segment format to newline-delimited JSON, since §6
//! mandates a human-readable on-disk record format. Unlike the WAL writer we
//! don't keep a long-lived segment handle across calls — each append reopens
//! the file, which matches the "file-local advisory lock" framing (the lock
//! is what serializes, not a cached handle) and keeps this module a few
//! dozen lines instead of a segment-rotation state machine.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Append one line to `path`, creating the file (and its parent directory)
/// if necessary. Every write is followed by an `fsync`. Callers are
/// expected to already hold the per-slug lock that serializes writers
/// within this process — this function doesn't lock itself.
pub fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    Ok(())
}

/// Read `path` line by line, skipping blank lines. Returns an empty vec if the file doesn't exist yet —
/// a node with no records is simply empty, not an error.
pub fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
