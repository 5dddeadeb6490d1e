//! Cross-encoder reranking: "submit to a
//! cross-encoder scoring service, replace the fused score with the
//! cross-encoder's raw score for these candidates".

pub mod api;
pub mod error;
pub mod mock;
pub mod prompt;

pub use api::ApiReranker;
pub use error::RerankError;
pub use mock::MockReranker;

/// A relevance score the reranker assigned to one candidate.
#[derive(Debug, Clone)]
pub struct RerankScore {
    /// Index into the original candidate list.
    pub index: usize,
    /// Raw relevance score in `[0.0, 1.0]`.
    pub relevance_score: f32,
}

/// Pluggable cross-encoder interface. `snippets` is
/// `(original_index, bullet_text)` pairs so implementations can batch one
/// request and map scores back without the caller re-deriving positions.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, snippets: &[(usize, &str)]) -> Result<Vec<RerankScore>, RerankError>;
}
