//! Opens a project root and dispatches [`crate::Command`]s against it.
//!
//! `Executor` is the one place that wires every crate in the workspace
//! together: `kg-store` for record writes, `kg-index` for the derived
//! store, `kg-vector` for ANN search, `kg-intelligence` for embeddings and
//! reranking, and `kg-ranker` for the hybrid pipeline. `kg-cli` and a
//! future stdio tool-protocol server both sit on top of this.

use crate::command::Command;
use crate::output::{NodeStatus, Output, SearchHitOut, StatusReport};
use kg_core::{KgResult, ProjectConfig};
use kg_index::DerivedStore;
use kg_intelligence::embed::{EmbeddingProvider, Provider};
use kg_intelligence::rerank::{ApiReranker, MockReranker, Reranker};
use kg_ranker::{HybridRanker, QueryRequest};
use kg_store::RecordStore;
use kg_vector::{VectorServer, VectorServerHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Executor {
    root: PathBuf,
    store: Arc<RecordStore>,
    derived: Arc<DerivedStore>,
    provider: Arc<Provider>,
    ranker: HybridRanker,
    budget_threshold: u64,
    /// Kept alive so the vector server's worker thread stays running for
    /// the lifetime of this `Executor`.
    _vector_handle: VectorServerHandle,
}

impl Executor {
    /// Open (or initialize) the project at `root`: load config, open the
    /// record store, rebuild/open the derived store, load the vector
    /// server from the embedding table, and wire a [`HybridRanker`].
    pub fn open(root: impl Into<PathBuf>) -> KgResult<Executor> {
        let root = root.into();
        let config = ProjectConfig::load(&root)?;

        let store = Arc::new(RecordStore::open(&root)?);
        let provider = Arc::new(Provider::from_model_string(&config.embeddings.model)?);
        let derived = Arc::new(DerivedStore::open(&root, &store, &provider.model_id())?);

        let vector_handle = VectorServer::start(derived.embedding_rows());
        let vector = vector_handle.server.clone();

        let reranker = build_reranker(&config.search);
        let budget_threshold = config.review.budget_threshold;

        let ranker = HybridRanker::new(
            store.clone(),
            derived.clone(),
            vector,
            provider.clone(),
            reranker,
            config.search.clone(),
            budget_threshold,
        );

        Ok(Executor { root, store, derived, provider, ranker, budget_threshold, _vector_handle: vector_handle })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dispatch one [`Command`] and return its [`Output`].
    pub fn dispatch(&self, command: Command) -> KgResult<Output> {
        match command {
            Command::Context { query, session_id, rerank_query, k, char_budget } => {
                let result = self.ranker.context(QueryRequest { query, session_id, rerank_query, k, char_budget })?;
                Ok(Output::Context { text: result.text, partial: result.partial })
            }
            Command::Search { query, limit } => {
                let hits = self.ranker.search(&query, limit.unwrap_or(kg_ranker::DEFAULT_K))?;
                Ok(Output::Search {
                    hits: hits
                        .into_iter()
                        .map(|h| SearchHitOut { bullet_id: h.bullet_id, slug: h.slug, text: h.text, score: h.score })
                        .collect(),
                })
            }
            Command::Show { slug } => Ok(Output::Show { text: self.ranker.show(&slug)? }),
            Command::AddBullet { slug, text, kind } => {
                let bullet_id = self.store.add(&slug, &text, kind.unwrap_or_default())?;
                // Single-process convenience: reindex this slug immediately
                // so a query issued right after `add_bullet` in the same
                // process sees it, rather than waiting for a separate
                // watcher's debounce cycle.
                if let Ok(pending) = self.derived.reindex_node(&self.store, &slug) {
                    self.embed_pending(pending);
                }
                Ok(Output::BulletAdded { bullet_id })
            }
            Command::MarkReviewed { slug } => {
                self.store.mark_reviewed(&slug)?;
                self.derived.budget.mark_reviewed(&slug)?;
                Ok(Output::Ok)
            }
            Command::Status => Ok(Output::Status(self.status_report()?)),
            Command::Reindex => {
                let pending = self.derived.reindex_all(&self.store)?;
                self.embed_pending(pending);
                Ok(Output::Ok)
            }
            Command::Calibrate => {
                let cal = kg_ranker::calibrate::calibrate(
                    &self.store,
                    &self.derived,
                    &self._vector_handle.server,
                    &self.provider,
                )?;
                self.ranker.set_calibration(cal);
                Ok(Output::Ok)
            }
        }
    }

    fn status_report(&self) -> KgResult<StatusReport> {
        let mut nodes = Vec::new();
        for slug in self.store.list_slugs()? {
            let live = self.store.list(&slug)?.len();
            let served_budget = self.derived.budget.served_budget(&slug);
            nodes.push(NodeStatus {
                flagged: self.derived.budget.is_flagged(&slug, live, self.budget_threshold),
                slug,
                live_bullet_count: live,
                served_budget,
            });
        }
        let calibration_due =
            matches!(self.ranker.calibration_due(), kg_ranker::PendingCalibration::Due);
        Ok(StatusReport { nodes, calibration_due })
    }

    /// Compute and store embeddings for every pending bullet synchronously
    /// — used by one-shot commands (`add_bullet`, `reindex`) that don't
    /// have a running `kg-watcher`/`EmbedQueue` to do it off the critical
    /// path. A long-running `serve` process should use
    /// `kg-watcher`'s bounded queue instead.
    fn embed_pending(&self, pending: Vec<kg_index::PendingEmbed>) {
        for job in pending {
            match self.provider.embed(&[job.text.clone()]) {
                Ok(mut vectors) => {
                    if let Some(vector) = vectors.pop() {
                        if self.derived.store_embedding(&job.bullet_id, vector.clone(), &job.text).is_ok() {
                            self._vector_handle.server.upsert(job.bullet_id, vector);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(bullet_id = %job.bullet_id, error = %e, "embedding failed, bullet stays unembedded");
                    let _ = self.derived.clear_embedding(&job.bullet_id);
                }
            }
        }
    }
}

fn build_reranker(search: &kg_core::config::SearchConfig) -> Option<Arc<dyn Reranker>> {
    if !search.use_reranker {
        return None;
    }
    // SPEC_FULL.md §6 open question, resolved here: `reranker_model` is
    // `"<endpoint>|<model>"` for a live cross-encoder endpoint; anything
    // else (including empty) falls back to the deterministic mock, which
    // is what local-only / offline projects want by default.
    match search.reranker_model.split_once('|') {
        Some((endpoint, model)) => Some(Arc::new(ApiReranker::new(endpoint, model, None, 5_000))),
        None => Some(Arc::new(MockReranker)),
    }
}
