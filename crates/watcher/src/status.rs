//! Status file reporting.

use chrono::{DateTime, Utc};
use kg_core::KgResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusEntry {
    pub slug: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// `<index_dir>/status.json`: the most recent persistent failure per slug,
/// read by `kg status` and similar diagnostics. Replaced wholesale on each
/// write rather than appended, since only the latest failure per slug
/// matters.
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(index_dir: &Path) -> Self {
        StatusFile {
            path: index_dir.join("status.json"),
        }
    }

    fn read_all(&self) -> Vec<StatusEntry> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Record a persistent failure for `slug`, replacing any prior entry
    /// for the same slug.
    pub fn report(&self, slug: &str, message: &str) -> KgResult<()> {
        let mut entries = self.read_all();
        entries.retain(|e| e.slug != slug);
        entries.push(StatusEntry {
            slug: slug.to_string(),
            message: message.to_string(),
            at: Utc::now(),
        });
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// Clear a slug's failure entry once it reindexes successfully again.
    pub fn clear(&self, slug: &str) -> KgResult<()> {
        let mut entries = self.read_all();
        let before = entries.len();
        entries.retain(|e| e.slug != slug);
        if entries.len() != before {
            std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> Vec<StatusEntry> {
        self.read_all()
    }
}
