//! Tokenizer, BM25-lite scorer, and in-memory inverted index.

pub mod index;
pub mod scorer;
pub mod tokenizer;

pub use index::{InvertedIndex, PostingEntry, ScoredHit};
pub use scorer::{BM25LiteScorer, Scorer, ScorerContext, SearchDoc};
pub use tokenizer::{tokenize, tokenize_unique};
