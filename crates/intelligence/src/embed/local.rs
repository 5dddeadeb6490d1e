//! `local_on_device` embedding provider.
//!
//! Bundling a real transformer (MiniLM-class model plus its tensor runtime)
//! is out of proportion here and would make the provider network-dependent
//! at first use, defeating the point of "local, no network" — so this
//! provider instead hashes character n-grams into a fixed-width vector (a
//! deterministic bag-of-n-grams projection, the classic "hashing trick").
//! It keeps the contract `embed(text) -> same vector every time, no
//! network, no external state` without the model-loading machinery.
//! Swapping in a real transformer later only touches this file.

use super::EmbeddingProvider;
use kg_core::KgResult;

const DEFAULT_DIM: usize = 256;
const NGRAM_SIZE: usize = 3;

pub struct LocalOnDeviceProvider {
    variant: String,
    dim: usize,
}

impl LocalOnDeviceProvider {
    pub fn new(variant: &str) -> Self {
        LocalOnDeviceProvider {
            variant: variant.to_string(),
            dim: DEFAULT_DIM,
        }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        let lower = text.to_lowercase();
        let chars: Vec<char> = lower.chars().collect();
        if chars.is_empty() {
            return v;
        }
        let n = NGRAM_SIZE.min(chars.len());
        for window in chars.windows(n) {
            let gram: String = window.iter().collect();
            let hash = kg_core::hash::hash_text(&gram);
            let bucket = (hash % self.dim as u64) as usize;
            // Sign determined by a second bit of the hash, standard feature-
            // hashing variance-reduction trick (avoids every collision adding
            // in the same direction).
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        kg_vector::normalize(&mut v);
        v
    }
}

impl EmbeddingProvider for LocalOnDeviceProvider {
    fn embed(&self, batch: &[String]) -> KgResult<Vec<Vec<f32>>> {
        Ok(batch.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> String {
        format!("local:{}", self.variant)
    }
}
