//! The hybrid ranker: keyword + vector retrieval, quantile
//! calibration, fusion, session dedup/boost, cross-encoder reranking, and
//! node-grouped, budget-bounded formatting.
//!
//! Orchestrates `kg-store` (bullet text), `kg-index` (keyword index,
//! backlinks, budget accounting), `kg-vector` (ANN search), and
//! `kg-intelligence` (embeddings, calibration math, reranking) behind one
//! entry point, [`HybridRanker`].

pub mod calibrate;
pub mod deadline;
pub mod format;
pub mod fusion;
pub mod ranker;
pub mod session;

pub use deadline::Deadline;
pub use format::{FormattedContext, RankedBullet};
pub use ranker::{
    HybridRanker, PendingCalibration, QueryRequest, RankedContext, SearchHit, DEFAULT_CHAR_BUDGET, DEFAULT_K,
    POOL_SIZE,
};
pub use session::SessionTracker;
