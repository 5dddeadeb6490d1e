//! In-memory inverted index.
//!
//! Grounded in the teacher's `engine::search::index::InvertedIndex`
//! (`PostingEntry`, `ScoredDocId`, `DocIdMap`): same compact-`u32`-doc-id
//! design so posting lists don't clone a bullet id string per term. Dropped
//! from the teacher's version: the segmented active/sealed-mmap-segment
//! architecture — at this system's node counts a single in-memory structure
//! stays well inside budget, and sealing to disk buys nothing a full rebuild
//! from records doesn't already give us.
//!
//! This satisfies spec.md's "SQLite FTS5 or any equivalent inverted index
//! that exposes per-row BM25" via the equivalent-inverted-index option,
//! matching the teacher's own choice not to reach for `rusqlite` in its
//! primary keyword path either (see DESIGN.md).

use crate::scorer::{BM25LiteScorer, Scorer, ScorerContext, SearchDoc};
use std::collections::{BTreeMap, HashMap};

/// One posting: a document (by compact id) containing a term, plus enough
/// to recompute BM25 without re-tokenizing the document body.
#[derive(Debug, Clone, Copy)]
pub struct PostingEntry {
    pub doc_id: u32,
    pub tf: u32,
}

/// A scored hit, keyed by the caller-facing bullet id.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub bullet_id: String,
    pub score: f32,
}

struct DocRecord {
    bullet_id: String,
    slug: String,
    ts_micros: u64,
    doc_len: u32,
}

/// The keyword index for one derived store. Row key is `bullet_id`
///; `upsert`/`remove` are the two mutations `kg-index`'s
/// `reindex_node` emits.
#[derive(Default)]
pub struct InvertedIndex {
    /// term -> postings, `BTreeMap` so prefix queries are a contiguous range
    /// scan (`range(prefix..)` while the key still starts with `prefix`).
    postings: BTreeMap<String, Vec<PostingEntry>>,
    docs: HashMap<u32, DocRecord>,
    bullet_to_doc: HashMap<String, u32>,
    next_doc_id: u32,
    total_len_tokens: u64,
    scorer: BM25LiteScorer,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Index (or re-index) a bullet. Any prior postings for this id are
    /// removed first so `upsert` is idempotent under repeated calls with
    /// the same text.
    pub fn upsert(&mut self, bullet_id: &str, slug: &str, text: &str, ts_micros: u64) {
        self.remove(bullet_id);

        let terms = crate::tokenizer::tokenize(text);
        let doc_len = terms.len() as u32;
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        let mut tf: HashMap<String, u32> = HashMap::new();
        for term in terms {
            *tf.entry(term).or_insert(0) += 1;
        }
        for (term, count) in tf {
            self.postings.entry(term).or_default().push(PostingEntry { doc_id, tf: count });
        }

        self.total_len_tokens += doc_len as u64;
        self.docs.insert(
            doc_id,
            DocRecord {
                bullet_id: bullet_id.to_string(),
                slug: slug.to_string(),
                ts_micros,
                doc_len,
            },
        );
        self.bullet_to_doc.insert(bullet_id.to_string(), doc_id);
    }

    /// Remove a bullet's postings. A no-op if it was never indexed.
    pub fn remove(&mut self, bullet_id: &str) {
        let Some(doc_id) = self.bullet_to_doc.remove(bullet_id) else {
            return;
        };
        if let Some(doc) = self.docs.remove(&doc_id) {
            self.total_len_tokens = self.total_len_tokens.saturating_sub(doc.doc_len as u64);
        }
        self.postings.retain(|_, entries| {
            entries.retain(|e| e.doc_id != doc_id);
            !entries.is_empty()
        });
    }

    fn avg_doc_len(&self) -> f32 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_len_tokens as f32 / self.docs.len() as f32
        }
    }

    /// The owning slug of an indexed bullet, used by the ranker to fetch
    /// the full `Bullet` from the record store for formatting and
    /// reranking (the index itself only keeps enough of the body to score
    /// BM25, not the original text).
    pub fn slug_of(&self, bullet_id: &str) -> Option<&str> {
        let doc_id = self.bullet_to_doc.get(bullet_id)?;
        self.docs.get(doc_id).map(|d| d.slug.as_str())
    }

    /// Terms in the index matching `token` exactly or by prefix.
    fn expand_term(&self, token: &str) -> Vec<&str> {
        self.postings
            .range(token.to_string()..)
            .take_while(|(term, _)| term.starts_with(token))
            .map(|(term, _)| term.as_str())
            .collect()
    }

    /// Run an OR-expanded, prefix-aware BM25-like search. Each query token contributes candidates via itself or
    /// any term it prefixes; tokens are unioned (a candidate need not match
    /// every token — the BM25 sum naturally down-weights partial matches,
    /// so this index doesn't also need an AND-filter stage).
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredHit> {
        let tokens = crate::tokenizer::tokenize_unique(query);
        if tokens.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }

        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut candidate_ids: std::collections::HashSet<u32> = std::collections::HashSet::new();
        for token in &tokens {
            for term in self.expand_term(token) {
                let entries = &self.postings[term];
                doc_freqs.insert(term.to_string(), entries.len());
                for e in entries {
                    candidate_ids.insert(e.doc_id);
                }
            }
        }
        if candidate_ids.is_empty() {
            return Vec::new();
        }

        let mut ctx = ScorerContext::new(self.docs.len());
        ctx.avg_doc_len = self.avg_doc_len();
        ctx.doc_freqs = doc_freqs;

        // The expanded query (each matched term OR'd with its original
        // token) is itself a valid query string for `BM25LiteScorer`
        // (it re-tokenizes and looks up term frequency per query term).
        let expanded_query: Vec<&str> = tokens
            .iter()
            .flat_map(|t| self.expand_term(t))
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        let expanded_query = expanded_query.join(" ");

        let mut hits: Vec<ScoredHit> = candidate_ids
            .into_iter()
            .filter_map(|doc_id| {
                let doc = self.docs.get(&doc_id)?;
                // Body text isn't stored a second time; BM25 only needs
                // term frequency and document length, both preserved
                // exactly by reconstructing a term-multiset stand-in body
                // from the postings themselves.
                let search_doc = SearchDoc::new(self.reconstruct_body(doc_id))
                    .with_title(doc.slug.clone())
                    .with_timestamp(doc.ts_micros);
                let score = self.scorer.score(&search_doc, &expanded_query, &ctx);
                if score > 0.0 {
                    Some(ScoredHit {
                        bullet_id: doc.bullet_id.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.bullet_id.cmp(&b.bullet_id))
        });
        hits.truncate(limit);
        hits
    }

    /// Rebuild a term-frequency-faithful stand-in for a document's body from
    /// its postings, repeating each term `tf` times. `BM25LiteScorer` only
    /// needs term frequency and document length, both of which this
    /// preserves exactly, so scoring against the reconstructed body is
    /// identical to scoring against the original text.
    fn reconstruct_body(&self, doc_id: u32) -> String {
        let mut terms = Vec::new();
        for (term, entries) in &self.postings {
            for e in entries {
                if e.doc_id == doc_id {
                    for _ in 0..e.tf {
                        terms.push(term.as_str());
                    }
                }
            }
        }
        terms.join(" ")
    }
}
