//! # kg
//!
//! A local-first knowledge graph for AI coding agents: nodes keyed by a
//! slug, each holding an append-only list of short bullets, retrieved
//! through a hybrid keyword+vector ranker.
//!
//! Record logs under `<root>/nodes/<slug>/` are the source of truth; a
//! derived store (keyword index, backlinks, embeddings, budget counters)
//! is a rebuildable projection of them. Queries go through
//! [`Executor::dispatch`], which opens the derived store, the vector
//! server, and the hybrid ranker once and serves every
//! [`Command`]/[`Output`] pair against them.
//!
//! # Quick Start
//!
//! ```no_run
//! use kg::{Command, Executor};
//!
//! fn main() -> kg::KgResult<()> {
//!     let executor = Executor::open("./my-project")?;
//!
//!     executor.dispatch(Command::AddBullet {
//!         slug: "retry-policy".to_string(),
//!         text: "network calls retry 3x with exponential backoff".to_string(),
//!         kind: None,
//!     })?;
//!
//!     let result = executor.dispatch(Command::Context {
//!         query: "how do we handle retries".to_string(),
//!         session_id: None,
//!         rerank_query: None,
//!         k: None,
//!         char_budget: None,
//!     })?;
//!     println!("{result:?}");
//!     Ok(())
//! }
//! ```
//!
//! # Operations
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | `context` | Formatted, budget-bounded context block for a query |
//! | `search` | Raw fused/calibrated hits, unformatted |
//! | `show` | Every live bullet on one node |
//! | `add_bullet` | Append a bullet to a node |
//! | `mark_reviewed` | Reset a node's served-budget counter |
//! | `status` | Per-node served-budget and flagged state |
//! | `reindex` | Force a full derived-store rebuild |
//! | `calibrate` | Force a quantile calibration pass |
//!
//! A ninth operation, [`serve`], isn't part of the `Command`/`Output`
//! surface: it runs the watcher daemon to completion (until SIGTERM),
//! holding the cross-process writer lock for as long as it runs.
//!
//! # Architecture
//!
//! [`Executor`] is the one entry point; the crates behind it (store, search,
//! vector, intelligence, index, watcher, ranker) are not exposed here — only
//! this crate's re-exported surface and `kg-core`'s data model are part of
//! the public API.

// Re-export the public API from kg-executor.
pub use kg_executor::*;

pub use kg_core::{Bullet, BulletKind, KgError, KgResult, Node, ProjectConfig};
