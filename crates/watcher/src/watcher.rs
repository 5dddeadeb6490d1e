//! The watcher: subscribes to filesystem events under
//! `<root>/nodes/`, coalesces them into a per-slug dirty set, and hands
//! each settled slug to the indexer. Owns the only write handle to the
//! derived store.
//!
//! Grounded in the teacher's `engine::background::Scheduler`: that scheduler
//! runs a fixed worker pool draining a priority queue with per-task
//! `catch_unwind` isolation. This watcher generalizes the same shape down to
//! a single coalescing loop — one dirty set instead of a priority heap,
//! because every reindex job is equally urgent and must be deduplicated by
//! slug rather than merely ordered.

use crate::dirty::DirtySet;
use crate::retry::Backoff;
use crate::status::StatusFile;
use chrono::{DateTime, Utc};
use kg_index::DerivedStore;
use kg_intelligence::embed::queue::{EmbedJob, EmbedQueue};
use kg_store::RecordStore;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How long a slug must go quiet before it's reindexed.
    pub debounce: Duration,
    /// How often the loop wakes up even with no filesystem events, to
    /// service debounce expiry and retry schedules.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig {
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Handle to the running watcher. Dropping this without calling
/// [`Watcher::shutdown`] stops the filesystem subscription (the
/// `RecommendedWatcher` is dropped) but leaves the loop thread running
/// until it next wakes and observes the shutdown flag — callers that care
/// about a clean stop should call `shutdown` explicitly.
pub struct Watcher {
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
    _fs_watcher: RecommendedWatcher,
}

impl Watcher {
    /// Start watching `<root>/nodes/` and dispatching settled slugs to
    /// `derived.reindex_node`. `embed_queue` receives a job for every bullet
    /// `reindex_node` reports as pending-embed; wiring the resulting
    /// vectors back into the derived store and vector server is the
    /// caller's concern via the queue's `process` closure, not the
    /// watcher's.
    pub fn start(
        root: PathBuf,
        store: Arc<RecordStore>,
        derived: Arc<DerivedStore>,
        embed_queue: EmbedQueue,
        config: WatcherConfig,
    ) -> notify::Result<Watcher> {
        let nodes_dir = kg_store::paths::nodes_dir(&root);
        std::fs::create_dir_all(&nodes_dir)?;

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut fs_watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        fs_watcher.watch(&nodes_dir, RecursiveMode::Recursive)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let loop_shutdown = shutdown.clone();
        let status = StatusFile::new(&kg_store::paths::index_dir(&root));

        let join = std::thread::Builder::new()
            .name("kg-watcher".into())
            .spawn(move || run_loop(rx, nodes_dir, store, derived, embed_queue, status, loop_shutdown, config))
            .expect("failed to spawn watcher thread");

        Ok(Watcher {
            shutdown,
            join: Some(join),
            _fs_watcher: fs_watcher,
        })
    }

    /// Signal the loop to stop and block until it exits. The debounce
    /// flush in progress, if any, is allowed to finish first.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(
    rx: mpsc::Receiver<notify::Result<Event>>,
    nodes_dir: PathBuf,
    store: Arc<RecordStore>,
    derived: Arc<DerivedStore>,
    embed_queue: EmbedQueue,
    status: StatusFile,
    shutdown: Arc<AtomicBool>,
    config: WatcherConfig,
) {
    let dirty = DirtySet::new();
    let mut backoffs: HashMap<String, Backoff> = HashMap::new();
    let mut retry_at: HashMap<String, Instant> = HashMap::new();
    let mut last_reviewed: HashMap<String, DateTime<Utc>> = HashMap::new();

    loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }

        match rx.recv_timeout(config.poll_interval) {
            Ok(Ok(event)) => {
                for slug in slugs_touched_by(&event, &nodes_dir) {
                    dirty.mark(&slug);
                }
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "filesystem watch error"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        let mut ready = dirty.take_ready(config.debounce);
        let now = Instant::now();
        let due_retries: Vec<String> = retry_at
            .iter()
            .filter(|(_, &at)| now >= at)
            .map(|(slug, _)| slug.clone())
            .collect();
        for slug in &due_retries {
            retry_at.remove(slug);
        }
        ready.extend(due_retries);
        ready.sort();
        ready.dedup();

        for slug in ready {
            match derived.reindex_node(&store, &slug) {
                Ok(pending) => {
                    backoffs.remove(&slug);
                    let _ = status.clear(&slug);
                    for p in pending {
                        embed_queue.submit(EmbedJob { bullet_id: p.bullet_id, text: p.text });
                    }
                    check_reviewed(&store, &derived, &slug, &mut last_reviewed);
                }
                Err(e) => {
                    tracing::warn!(slug = %slug, error = %e, "reindex failed, will retry");
                    let _ = status.report(&slug, &e.to_string());
                    let backoff = backoffs.entry(slug.clone()).or_insert_with(Backoff::new);
                    let delay = backoff.next_delay();
                    retry_at.insert(slug, Instant::now() + delay);
                }
            }
        }
    }
}

/// Map filesystem event paths back to the slug directory directly under
/// `nodes/`, so `nodes/<slug>/node.jsonl` and `nodes/<slug>/meta.jsonl`
/// both mark the same dirty slug.
fn slugs_touched_by(event: &Event, nodes_dir: &Path) -> Vec<String> {
    event
        .paths
        .iter()
        .filter_map(|p| {
            p.strip_prefix(nodes_dir)
                .ok()?
                .components()
                .next()
                .and_then(|c| c.as_os_str().to_str())
                .map(|s| s.to_string())
        })
        .collect()
}

/// Detect a newly appended `reviewed` record and reset the budget
/// accountant's counter for it. The record's own meaning is already handled by
/// `RecordStore::mark_reviewed` appending it; this just notices.
fn check_reviewed(
    store: &RecordStore,
    derived: &DerivedStore,
    slug: &str,
    last_reviewed: &mut HashMap<String, DateTime<Utc>>,
) {
    let Ok(meta) = kg_store::replay_meta(store.root(), slug) else {
        return;
    };
    let Some(cleared_at) = meta.cleared_at else {
        return;
    };
    let changed = match last_reviewed.get(slug) {
        Some(prev) => *prev != cleared_at,
        None => true,
    };
    if changed {
        last_reviewed.insert(slug.to_string(), cleared_at);
        let _ = derived.budget.mark_reviewed(slug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_core::BulletKind;
    use kg_intelligence::embed::queue::EmbedQueue as Queue;
    use std::sync::Mutex;

    fn open(root: &Path) -> (Arc<RecordStore>, Arc<DerivedStore>) {
        let store = Arc::new(RecordStore::open(root).unwrap());
        let derived = Arc::new(DerivedStore::open(root, &store, "local:on-device").unwrap());
        (store, derived)
    }

    #[test]
    fn edit_is_picked_up_and_reindexed() {
        let dir = tempfile::tempdir().unwrap();
        let (store, derived) = open(dir.path());
        store.add("t", "alpha", BulletKind::Note).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let queue_handle = Queue::start(16, move |job| {
            seen_clone.lock().unwrap().push(job.bullet_id);
        });

        let watcher = Watcher::start(
            dir.path().to_path_buf(),
            store.clone(),
            derived.clone(),
            queue_handle.queue,
            WatcherConfig {
                debounce: Duration::from_millis(30),
                poll_interval: Duration::from_millis(10),
            },
        )
        .unwrap();

        store.add("t", "beta", BulletKind::Note).unwrap();
        std::thread::sleep(Duration::from_millis(300));

        assert!(!derived.search_keyword("beta", 10).is_empty());
        watcher.shutdown();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn mark_reviewed_resets_budget_counter() {
        let dir = tempfile::tempdir().unwrap();
        let (store, derived) = open(dir.path());
        store.add("t", "alpha", BulletKind::Note).unwrap();
        derived.budget.accrue("t", 10_000).unwrap();
        assert!(derived.budget.is_flagged("t", 1, 100));

        let queue_handle = Queue::start(4, |_job| {});
        let watcher = Watcher::start(
            dir.path().to_path_buf(),
            store.clone(),
            derived.clone(),
            queue_handle.queue,
            WatcherConfig {
                debounce: Duration::from_millis(30),
                poll_interval: Duration::from_millis(10),
            },
        )
        .unwrap();

        store.mark_reviewed("t").unwrap();
        // touch the node so a filesystem event fires and the slug gets reprocessed
        store.add("t", "beta", BulletKind::Note).unwrap();
        std::thread::sleep(Duration::from_millis(300));

        assert!(!derived.budget.is_flagged("t", 2, 100));
        watcher.shutdown();
    }
}
