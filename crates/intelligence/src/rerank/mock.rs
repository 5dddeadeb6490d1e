//! Deterministic reranker for tests: no network call, a score derived
//! purely from lexical overlap so tests can assert on ordering without a
//! live model.

use super::{RerankError, RerankScore, Reranker};
use std::collections::HashSet;

pub struct MockReranker;

fn tokenize_lower(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

impl Reranker for MockReranker {
    fn rerank(&self, query: &str, snippets: &[(usize, &str)]) -> Result<Vec<RerankScore>, RerankError> {
        let query_terms = tokenize_lower(query);
        if query_terms.is_empty() {
            return Err(RerankError::Parse("empty query".to_string()));
        }
        Ok(snippets
            .iter()
            .map(|(index, text)| {
                let doc_terms = tokenize_lower(text);
                let overlap = query_terms.intersection(&doc_terms).count();
                let relevance_score = overlap as f32 / query_terms.len() as f32;
                RerankScore {
                    index: *index,
                    relevance_score,
                }
            })
            .collect())
    }
}
