//! BM25-lite scorer.
//!
//! Adapted from the teacher's `search::scorer` module: same `ScorerContext`
//! IDF-with-smoothing formula, same k1/b defaults, same recency and title
//! boosts, generalized from a generic `SearchDoc` to a bullet's own fields
//! (`slug` stands in for title, `kind` is carried for future extension but
//! doesn't affect scoring today).

use crate::tokenizer::tokenize;
use std::collections::HashMap;

/// A document as seen by the scorer: a bullet's text plus the signals
/// `BM25LiteScorer` uses (title/slug for the title-match boost, timestamp
/// for the recency boost).
#[derive(Debug, Clone)]
pub struct SearchDoc {
    pub body: String,
    pub title: Option<String>,
    pub ts_micros: Option<u64>,
}

impl SearchDoc {
    pub fn new(body: String) -> Self {
        SearchDoc {
            body,
            title: None,
            ts_micros: None,
        }
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_timestamp(mut self, ts: u64) -> Self {
        self.ts_micros = Some(ts);
        self
    }
}

/// Corpus-level statistics needed for IDF and length normalization.
#[derive(Debug, Clone)]
pub struct ScorerContext {
    pub total_docs: usize,
    pub doc_freqs: HashMap<String, usize>,
    pub avg_doc_len: f32,
    pub now_micros: u64,
}

impl ScorerContext {
    pub fn new(total_docs: usize) -> Self {
        ScorerContext {
            total_docs,
            doc_freqs: HashMap::new(),
            avg_doc_len: 0.0,
            now_micros: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_micros() as u64,
        }
    }

    /// `IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`.
    pub fn idf(&self, term: &str) -> f32 {
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        let n = self.total_docs as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    pub fn add_doc_freq(&mut self, term: &str, count: usize) {
        self.doc_freqs.insert(term.to_string(), count);
    }
}

impl Default for ScorerContext {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Pluggable scoring interface. Scores are not normalized; `kg-intelligence`'s
/// calibrator handles cross-channel comparison.
pub trait Scorer: Send + Sync {
    fn score(&self, doc: &SearchDoc, query: &str, ctx: &ScorerContext) -> f32;
    fn name(&self) -> &str;
}

/// BM25-inspired scorer: `score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 -
/// b + b * dl/avgdl))` summed over query terms, with a 20% title-match boost
/// and a recency boost that decays over 24h.
#[derive(Debug, Clone)]
pub struct BM25LiteScorer {
    k1: f32,
    b: f32,
    recency_boost: f32,
}

impl Default for BM25LiteScorer {
    fn default() -> Self {
        BM25LiteScorer {
            k1: 1.2,
            b: 0.75,
            recency_boost: 0.1,
        }
    }
}

impl BM25LiteScorer {
    pub fn new(k1: f32, b: f32) -> Self {
        BM25LiteScorer {
            k1,
            b,
            recency_boost: 0.0,
        }
    }

    pub fn with_recency_boost(mut self, factor: f32) -> Self {
        self.recency_boost = factor;
        self
    }
}

impl Scorer for BM25LiteScorer {
    fn score(&self, doc: &SearchDoc, query: &str, ctx: &ScorerContext) -> f32 {
        let query_terms = tokenize(query);
        let doc_terms = tokenize(&doc.body);
        let doc_len = doc_terms.len() as f32;

        if query_terms.is_empty() || doc_terms.is_empty() {
            return 0.0;
        }

        let mut doc_term_counts: HashMap<&str, usize> = HashMap::new();
        for term in &doc_terms {
            *doc_term_counts.entry(term.as_str()).or_insert(0) += 1;
        }

        let mut score = 0.0;
        for query_term in &query_terms {
            let tf = doc_term_counts.get(query_term.as_str()).copied().unwrap_or(0) as f32;
            if tf == 0.0 {
                continue;
            }
            let idf = ctx.idf(query_term);
            let avg_len = ctx.avg_doc_len.max(1.0);
            let tf_component = (tf * (self.k1 + 1.0))
                / (tf + self.k1 * (1.0 - self.b + self.b * doc_len / avg_len));
            score += idf * tf_component;
        }

        if self.recency_boost > 0.0 {
            if let Some(ts) = doc.ts_micros {
                let age_hours = (ctx.now_micros.saturating_sub(ts)) as f32 / 3_600_000_000.0;
                let recency_factor = 1.0 / (1.0 + age_hours / 24.0);
                score *= 1.0 + self.recency_boost * recency_factor;
            }
        }

        if let Some(title) = &doc.title {
            let title_terms = tokenize(title);
            for query_term in &query_terms {
                if title_terms.contains(query_term) {
                    score *= 1.2;
                    break;
                }
            }
        }

        score
    }

    fn name(&self) -> &str {
        "bm25-lite"
    }
}
