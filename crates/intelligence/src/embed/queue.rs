//! Bounded embedding work queue, backed by a single bounded
//! `std::sync::mpsc::sync_channel` — bounded channels already give blocking
//! backpressure on a full queue for free, and every embedding job is
//! equally urgent so no priority ordering is needed.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::JoinHandle;

/// A single embedding job: a bullet id plus the text to embed.
pub struct EmbedJob {
    pub bullet_id: String,
    pub text: String,
}

/// A bounded queue of embed jobs, drained by one worker thread that calls
/// `process` for each job. `submit` blocks once the queue is full,
/// providing backpressure to the watcher rather than unbounded memory
/// growth.
pub struct EmbedQueue {
    tx: SyncSender<EmbedJob>,
}

pub struct EmbedQueueHandle {
    pub queue: EmbedQueue,
    join: Option<JoinHandle<()>>,
}

impl EmbedQueueHandle {
    pub fn join(mut self) {
        drop(self.queue);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

impl EmbedQueue {
    /// Start the worker thread with a bounded capacity. `process` is called
    /// once per job, on the worker thread, never on the submitting thread.
    pub fn start(capacity: usize, process: impl Fn(EmbedJob) + Send + 'static) -> EmbedQueueHandle {
        let (tx, rx): (SyncSender<EmbedJob>, Receiver<EmbedJob>) = sync_channel(capacity);
        let join = std::thread::Builder::new()
            .name("kg-embed-queue".into())
            .spawn(move || {
                for job in rx.iter() {
                    // Isolate one job's panic from the rest of the queue.
                    let bullet_id = job.bullet_id.clone();
                    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| process(job))).is_err() {
                        tracing::error!(bullet_id, "embed queue worker panicked processing job");
                    }
                }
            })
            .expect("failed to spawn embed queue worker thread");
        EmbedQueueHandle {
            queue: EmbedQueue { tx },
            join: Some(join),
        }
    }

    /// Enqueue a job, blocking if the queue is at capacity.
    pub fn submit(&self, job: EmbedJob) {
        let _ = self.tx.send(job);
    }
}
