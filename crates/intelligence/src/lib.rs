//! Embedding providers, quantile calibration, and cross-encoder reranking.
//!
//! This crate is the intelligence layer sitting between the derived index
//! and the hybrid ranker: it turns bullet text into vectors (`embed`), turns
//! raw keyword/vector scores into comparable quantiles (`calibrate`), and
//! turns a candidate pool into a final relevance ordering (`rerank`).

pub mod calibrate;
pub mod embed;
pub mod rerank;

pub use calibrate::{Breakpoints, Calibration};
pub use embed::{EmbeddingProvider, Provider};
pub use rerank::{RerankError, RerankScore, Reranker};
