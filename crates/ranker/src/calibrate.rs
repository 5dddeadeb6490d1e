//! Calibration sampling: sample up to 200 random
//! nodes, pick one canonical bullet per node, issue a keyword and a vector
//! search against the full store for each, and collect every raw score
//! either channel returns.
//!
//! The quantile math (`Breakpoints::compute`, percentile interpolation)
//! lives in `kg_intelligence::calibrate`, which has no dependency on the
//! record store, derived store, or vector server; this module is the
//! orchestration glue that actually touches all three, so it lives here
//! rather than in `kg-intelligence`.

use crate::PendingCalibration;
use kg_core::KgResult;
use kg_index::DerivedStore;
use kg_intelligence::embed::{EmbeddingProvider, Provider};
use kg_intelligence::Calibration;
use kg_store::RecordStore;
use kg_vector::VectorServer;
use rand::seq::SliceRandom;

/// Up to how many nodes are sampled.
pub const SAMPLE_NODE_LIMIT: usize = 200;
/// How many raw scores are pulled per channel per sampled query — wide
/// enough that quantile breakpoints reflect the tail of the distribution,
/// not just the top handful of hits.
const SAMPLE_SEARCH_LIMIT: usize = 50;

/// Run the full calibration pass described in spec.md §4.F and return the
/// resulting breakpoints. `nothing_pending` signals the caller (the
/// watcher/ranker) that calibration just ran, clearing its deferred flag.
pub fn calibrate(
    store: &RecordStore,
    derived: &DerivedStore,
    vector: &VectorServer,
    provider: &Provider,
) -> KgResult<Calibration> {
    // spec.md §4.F: "sample up to 200 random nodes" — shuffle before
    // truncating rather than always sampling the same lexicographic prefix.
    let mut slugs = store.list_slugs()?;
    slugs.shuffle(&mut rand::thread_rng());
    slugs.truncate(SAMPLE_NODE_LIMIT);

    let mut keyword_samples = Vec::new();
    let mut vector_samples = Vec::new();

    for slug in &slugs {
        let bullets = store.list(slug)?;
        let Some(canonical) = bullets.first() else { continue };

        let hits = derived.search_keyword(&canonical.text, SAMPLE_SEARCH_LIMIT);
        keyword_samples.extend(hits.into_iter().map(|h| h.score));

        if let Ok(vectors) = provider.embed(&[canonical.text.clone()]) {
            if let Some(vec) = vectors.into_iter().next() {
                let hits = vector.query(vec, SAMPLE_SEARCH_LIMIT);
                vector_samples.extend(hits.into_iter().map(|(_, cosine)| cosine));
            }
        }
    }

    Ok(Calibration {
        keyword: kg_intelligence::calibrate::Breakpoints::compute(keyword_samples),
        vector: kg_intelligence::calibrate::Breakpoints::compute(vector_samples),
    })
}

/// Whether a fresh calibration pass is due, per the watcher's
/// `auto_calibrate_threshold` counter, wrapped so the
/// ranker can check it before serving a query without importing
/// `kg-index` directly in its public surface.
pub fn is_due(derived: &DerivedStore, threshold: f32) -> PendingCalibration {
    if derived.calibration_due(threshold) {
        PendingCalibration::Due
    } else {
        PendingCalibration::NotDue
    }
}
