//! The tool-protocol command surface: `context`, `search`, `show`,
//! `add_bullet`, `mark_reviewed`, plus the admin operations a CLI needs
//! (`status`, `reindex`, `calibrate`).
//!
//! `Command`/`Output` is an explicit, serializable enum pair so `kg-cli`
//! and a future stdio JSON-RPC server can dispatch through the same typed
//! surface without duplicating validation logic.

use kg_core::BulletKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// `context(query, session_id?) -> text_block`.
    Context {
        query: String,
        session_id: Option<String>,
        rerank_query: Option<String>,
        k: Option<usize>,
        char_budget: Option<usize>,
    },
    /// `search(query, limit?) -> [hit]`.
    Search { query: String, limit: Option<usize> },
    /// `show(slug) -> text_block`.
    Show { slug: String },
    /// `add_bullet(slug, text, kind?) -> bullet_id`.
    AddBullet {
        slug: String,
        text: String,
        kind: Option<BulletKind>,
    },
    /// `mark_reviewed(slug) -> ok`.
    MarkReviewed { slug: String },
    /// Per-node status: live bullet count, flagged state, served budget.
    Status,
    /// Force a full `reindex_all` pass outside the watcher's own cadence.
    Reindex,
    /// Force a calibration pass outside the watcher's
    /// `auto_calibrate_threshold` trigger.
    Calibrate,
}
