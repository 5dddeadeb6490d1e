//! Soft query deadline.
//!
//! Grounded in the teacher's `intelligence::hybrid::HybridSearch::search`
//! `Instant`-based budget checks (`start.elapsed() >= budget`). Each
//! suspension point (query embedding, vector RPC, cross-encoder RPC) runs
//! on its own thread; the caller waits up to the remaining budget and, on
//! timeout, gives up on that channel rather than blocking past the
//! deadline — "cancellation" here means "stop waiting and mark partial",
//! not forcibly killing the thread, since Rust has no safe preemptive
//! thread cancellation.

use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Default soft deadline for a full ranker query.
pub const DEFAULT_QUERY_DEADLINE: Duration = Duration::from_secs(10);

/// Tracks elapsed time against a fixed budget for one query.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Deadline {
        Deadline { start: Instant::now(), budget }
    }

    /// Time left before the deadline, `Duration::ZERO` if already past it.
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.start.elapsed())
    }

    pub fn expired(&self) -> bool {
        self.start.elapsed() >= self.budget
    }
}

/// Run `work` on a background thread, waiting at most `deadline.remaining()`
/// for it to finish. Returns `None` (and marks that channel partial to the
/// caller) if the deadline passes first or the thread panics; the thread
/// itself is not forcibly stopped, it just finishes writing into a dropped
/// channel.
pub fn run_with_timeout<T, F>(deadline: &Deadline, work: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(work));
        let _ = tx.send(result);
    });
    match rx.recv_timeout(deadline.remaining()) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(_)) => {
            tracing::error!("ranker subquery panicked");
            None
        }
        Err(_) => {
            tracing::warn!("ranker subquery exceeded the soft deadline, marking partial");
            None
        }
    }
}
