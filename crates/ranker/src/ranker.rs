//! The hybrid ranker: keyword + vector retrieval, quantile
//! calibration, fusion, session adjustment, cross-encoder reranking, and
//! node-grouped formatting, all within a soft deadline.

use crate::deadline::{run_with_timeout, Deadline, DEFAULT_QUERY_DEADLINE};
use crate::format::{format_context, FormattedContext, RankedBullet};
use crate::fusion::{fuse, ChannelQuantiles};
use crate::session::{SessionTracker, SESSION_NODE_BOOST};
use kg_core::config::SearchConfig;
use kg_core::{Bullet, KgError, KgResult};
use kg_index::DerivedStore;
use kg_intelligence::embed::Provider;
use kg_intelligence::rerank::Reranker;
use kg_intelligence::Calibration;
use kg_store::RecordStore;
use kg_vector::VectorServer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Candidate pool size the ranker pulls from each channel and hands to the
/// reranker.
pub const POOL_SIZE: usize = 60;
/// Default number of results returned after reranking.
pub const DEFAULT_K: usize = 20;
/// Default character budget for a formatted context block when the caller
/// doesn't supply one. spec.md leaves the default unspecified; chosen to
/// comfortably hold `DEFAULT_K` short bullets across a handful of nodes.
pub const DEFAULT_CHAR_BUDGET: usize = 6000;

/// One query's parameters.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: String,
    pub rerank_query: Option<String>,
    pub session_id: Option<String>,
    pub k: Option<usize>,
    pub char_budget: Option<usize>,
}

/// The ranker's response: the formatted block plus enough bookkeeping for
/// the caller to report partial results.
#[derive(Debug, Clone)]
pub struct RankedContext {
    pub text: String,
    pub bullet_ids: Vec<String>,
    /// Set if any subquery missed its deadline, a channel failed, the
    /// reranker was skipped after a provider error, or the char budget cut
    /// the block short.
    pub partial: bool,
}

/// A single hit for the `search(query, limit)` tool-protocol operation
/// — the fused/calibrated score without formatting or
/// reranking.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub bullet_id: String,
    pub slug: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCalibration {
    Due,
    NotDue,
}

struct Candidate {
    bullet_id: String,
    slug: String,
    kw_raw: Option<f32>,
    vec_raw: Option<f32>,
    score: f32,
}

/// Owns everything a query needs to read: the record store (for bullet
/// text), the derived store (keyword index, backlinks, budget), the vector
/// server, the embedding provider, calibration state, session tracking,
/// and an optional reranker.
pub struct HybridRanker {
    store: Arc<RecordStore>,
    derived: Arc<DerivedStore>,
    vector: VectorServer,
    provider: Arc<Provider>,
    reranker: Option<Arc<dyn Reranker>>,
    calibration: RwLock<Calibration>,
    session: SessionTracker,
    config: SearchConfig,
    budget_threshold: u64,
}

impl HybridRanker {
    pub fn new(
        store: Arc<RecordStore>,
        derived: Arc<DerivedStore>,
        vector: VectorServer,
        provider: Arc<Provider>,
        reranker: Option<Arc<dyn Reranker>>,
        config: SearchConfig,
        budget_threshold: u64,
    ) -> Self {
        HybridRanker {
            store,
            derived,
            vector,
            provider,
            reranker,
            calibration: RwLock::new(Calibration::default()),
            session: SessionTracker::new(),
            config,
            budget_threshold,
        }
    }

    /// Replace the calibration state, e.g. after the calibrator's periodic
    /// pass.
    pub fn set_calibration(&self, calibration: Calibration) {
        *self.calibration.write() = calibration;
    }

    /// Whether a fresh calibration pass is due per the watcher's
    /// `auto_calibrate_threshold` counter.
    pub fn calibration_due(&self) -> PendingCalibration {
        crate::calibrate::is_due(&self.derived, self.config.auto_calibrate_threshold)
    }

    /// `context(query, session_id?) -> text_block`, the full
    /// seven-stage pipeline.
    pub fn context(&self, request: QueryRequest) -> KgResult<RankedContext> {
        let deadline = Deadline::new(DEFAULT_QUERY_DEADLINE);
        let (candidates, partial_channels) = self.retrieve_and_fuse(&request.query, &deadline)?;

        let candidates = self.apply_session_adjustment(candidates, request.session_id.as_deref());

        let mut pool: Vec<Candidate> = candidates;
        sort_candidates(&mut pool);
        pool.truncate(POOL_SIZE);

        let bullets = self.fetch_bullets(&pool)?;
        let rerank_query = request.rerank_query.as_deref().unwrap_or(&request.query);
        let (ranked, rerank_partial) = self.rerank(&pool, &bullets, rerank_query, &deadline);

        let k = request.k.unwrap_or(DEFAULT_K);
        let mut final_ranked: Vec<RankedBullet> = ranked
            .into_iter()
            .take(k)
            .filter_map(|(bullet_id, score)| bullets.get(&bullet_id).map(|b| RankedBullet { bullet: b.clone(), score }))
            .collect();
        final_ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.bullet.id.cmp(&b.bullet.id))
        });

        let char_budget = request.char_budget.unwrap_or(DEFAULT_CHAR_BUDGET);
        let threshold = self.config_budget_threshold();
        let formatted = format_context(
            &final_ranked,
            char_budget,
            |slug| self.derived.budget.is_flagged(slug, self.live_count(slug), threshold),
            |slug| self.derived.backlinked_slugs(slug, crate::format::EXPLORE_HINT_LIMIT),
        );

        self.accrue_and_remember(&formatted, request.session_id.as_deref())?;

        Ok(RankedContext {
            text: formatted.text,
            bullet_ids: formatted.bullet_ids,
            partial: partial_channels || rerank_partial || formatted.truncated,
        })
    }

    /// `search(query, limit) -> [hit]`: fused/calibrated hits
    /// without reranking or formatting — a lighter-weight lookup for
    /// clients that want raw candidates.
    pub fn search(&self, query: &str, limit: usize) -> KgResult<Vec<SearchHit>> {
        let deadline = Deadline::new(DEFAULT_QUERY_DEADLINE);
        let (mut candidates, _partial) = self.retrieve_and_fuse(query, &deadline)?;
        sort_candidates(&mut candidates);
        candidates.truncate(limit);

        let bullets = self.fetch_bullets(&candidates)?;
        Ok(candidates
            .into_iter()
            .filter_map(|c| {
                bullets.get(&c.bullet_id).map(|b| SearchHit {
                    bullet_id: c.bullet_id,
                    slug: c.slug,
                    text: b.text.clone(),
                    score: c.score,
                })
            })
            .collect())
    }

    /// `show(slug) -> text_block`: every live bullet in a
    /// node, unranked, rendered with the same header/Explore-hint shape as
    /// `context` for a consistent reading experience.
    pub fn show(&self, slug: &str) -> KgResult<String> {
        let bullets = self.store.list(slug)?;
        let ranked: Vec<RankedBullet> = bullets
            .into_iter()
            .map(|b| RankedBullet { bullet: b, score: 0.0 })
            .collect();
        let threshold = self.config_budget_threshold();
        let formatted = format_context(
            &ranked,
            usize::MAX,
            |s| self.derived.budget.is_flagged(s, self.live_count(s), threshold),
            |s| self.derived.backlinked_slugs(s, crate::format::EXPLORE_HINT_LIMIT),
        );
        Ok(formatted.text)
    }

    fn config_budget_threshold(&self) -> u64 {
        self.budget_threshold
    }

    fn live_count(&self, slug: &str) -> usize {
        self.store.list(slug).map(|b| b.len()).unwrap_or(0)
    }

    /// Stages 1-4: keyword retrieval, vector retrieval,
    /// calibration, fusion. Returns the fused candidate list and whether
    /// either channel missed its deadline or failed outright.
    fn retrieve_and_fuse(&self, query: &str, deadline: &Deadline) -> KgResult<(Vec<Candidate>, bool)> {
        let derived = self.derived.clone();
        let q = query.to_string();
        let keyword_hits = run_with_timeout(deadline, move || derived.search_keyword(&q, POOL_SIZE));

        let provider = self.provider.clone();
        let vector = self.vector.clone();
        let q2 = query.to_string();
        let vector_hits = run_with_timeout(deadline, move || -> Option<Vec<(String, f32)>> {
            let vectors = kg_intelligence::embed::EmbeddingProvider::embed(provider.as_ref(), &[q2]).ok()?;
            let vec = vectors.into_iter().next()?;
            Some(vector.query(vec, POOL_SIZE))
        })
        .flatten();

        let keyword_failed = keyword_hits.is_none();
        let vector_failed = vector_hits.is_none();
        if keyword_failed && vector_failed {
            return Err(KgError::index_unavailable(
                "both keyword and vector retrieval channels failed or timed out",
            ));
        }

        let cal = self.calibration.read();
        let mut by_id: HashMap<String, Candidate> = HashMap::new();

        for hit in keyword_hits.unwrap_or_default() {
            let Some(slug) = self.derived.slug_of(&hit.bullet_id) else { continue };
            by_id.insert(
                hit.bullet_id.clone(),
                Candidate { bullet_id: hit.bullet_id, slug, kw_raw: Some(hit.score), vec_raw: None, score: 0.0 },
            );
        }
        for (bullet_id, cosine) in vector_hits.unwrap_or_default() {
            let Some(slug) = self.derived.slug_of(&bullet_id) else { continue };
            by_id
                .entry(bullet_id.clone())
                .and_modify(|c| c.vec_raw = Some(cosine))
                .or_insert_with(|| Candidate { bullet_id, slug, kw_raw: None, vec_raw: Some(cosine), score: 0.0 });
        }

        let mut candidates: Vec<Candidate> = by_id.into_values().collect();
        for c in &mut candidates {
            let kw_q = c.kw_raw.map(|raw| cal.keyword_quantile(raw)).unwrap_or(0.0);
            let vec_q = c.vec_raw.map(|raw| cal.vector_quantile(raw)).unwrap_or(0.0);
            c.score = fuse(ChannelQuantiles { keyword: kw_q, vector: vec_q }, &self.config);
        }

        Ok((candidates, keyword_failed || vector_failed))
    }

    /// Stage 5: drop already-served candidates, boost
    /// candidates from already-touched nodes.
    fn apply_session_adjustment(&self, candidates: Vec<Candidate>, session_id: Option<&str>) -> Vec<Candidate> {
        let Some(session_id) = session_id else { return candidates };
        candidates
            .into_iter()
            .filter(|c| !self.session.has_served(session_id, &c.bullet_id))
            .map(|mut c| {
                if self.session.has_touched(session_id, &c.slug) {
                    c.score *= SESSION_NODE_BOOST;
                }
                c
            })
            .collect()
    }

    /// Stage 6: cross-encoder rerank over the pool. Returns
    /// `(bullet_id, score)` in final order plus whether the rerank stage
    /// was skipped/failed (counts toward `partial`).
    fn rerank(
        &self,
        pool: &[Candidate],
        bullets: &HashMap<String, Bullet>,
        rerank_query: &str,
        deadline: &Deadline,
    ) -> (Vec<(String, f32)>, bool) {
        let fused: Vec<(String, f32)> = pool.iter().map(|c| (c.bullet_id.clone(), c.score)).collect();

        if !self.config.use_reranker {
            return (sorted_by_score_then_id(fused), false);
        }
        let Some(reranker) = self.reranker.clone() else {
            return (sorted_by_score_then_id(fused), false);
        };

        let snippets: Vec<(usize, String)> = pool
            .iter()
            .enumerate()
            .filter_map(|(i, c)| bullets.get(&c.bullet_id).map(|b| (i, b.text.clone())))
            .collect();
        let query = rerank_query.to_string();
        let pool_ids: Vec<String> = pool.iter().map(|c| c.bullet_id.clone()).collect();

        let result = run_with_timeout(deadline, move || {
            let refs: Vec<(usize, &str)> = snippets.iter().map(|(i, s)| (*i, s.as_str())).collect();
            reranker.rerank(&query, &refs)
        });

        match result {
            Some(Ok(scores)) => {
                let mut by_index: HashMap<usize, f32> = HashMap::new();
                for s in scores {
                    by_index.insert(s.index, s.relevance_score);
                }
                let reranked: Vec<(String, f32)> = pool_ids
                    .into_iter()
                    .enumerate()
                    .map(|(i, id)| (id, by_index.get(&i).copied().unwrap_or(0.0)))
                    .collect();
                (sorted_by_score_then_id(reranked), false)
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "reranker failed, falling back to fused order");
                (sorted_by_score_then_id(fused), true)
            }
            None => (sorted_by_score_then_id(fused), true),
        }
    }

    fn fetch_bullets(&self, candidates: &[Candidate]) -> KgResult<HashMap<String, Bullet>> {
        let mut slugs: Vec<&str> = candidates.iter().map(|c| c.slug.as_str()).collect();
        slugs.sort_unstable();
        slugs.dedup();

        let mut by_id = HashMap::new();
        for slug in slugs {
            for bullet in self.store.list(slug)? {
                by_id.insert(bullet.id.clone(), bullet);
            }
        }
        Ok(by_id)
    }

    fn accrue_and_remember(&self, formatted: &FormattedContext, session_id: Option<&str>) -> KgResult<()> {
        for (slug, chars) in &formatted.served_chars {
            self.derived.budget.accrue(slug, *chars)?;
        }
        if let Some(session_id) = session_id {
            for id in &formatted.bullet_ids {
                if let Some(slug) = self.derived.slug_of(id) {
                    self.session.record_served(session_id, id, &slug);
                }
            }
        }
        Ok(())
    }
}

fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.bullet_id.cmp(&b.bullet_id))
    });
}

fn sorted_by_score_then_id(mut scored: Vec<(String, f32)>) -> Vec<(String, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored
}
