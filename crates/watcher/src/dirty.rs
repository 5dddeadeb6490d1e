//! Per-slug dirty set with debounce coalescing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks the most recent filesystem event per slug. A slug is "ready" once
/// it has gone quiet for the debounce window, so a burst of rapid writes to
/// the same node collapses into a single reindex pass.
#[derive(Default)]
pub struct DirtySet {
    last_event: Mutex<HashMap<String, Instant>>,
}

impl DirtySet {
    pub fn new() -> Self {
        DirtySet::default()
    }

    /// Record that `slug` changed just now, resetting its debounce window.
    pub fn mark(&self, slug: &str) {
        self.last_event.lock().insert(slug.to_string(), Instant::now());
    }

    /// Remove and return every slug that has been quiet for at least
    /// `debounce`. Slugs still within their debounce window are left in
    /// place for the next poll.
    pub fn take_ready(&self, debounce: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut pending = self.last_event.lock();
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, &last)| now.duration_since(last) >= debounce)
            .map(|(slug, _)| slug.clone())
            .collect();
        for slug in &ready {
            pending.remove(slug);
        }
        ready
    }

    pub fn is_empty(&self) -> bool {
        self.last_event.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshly_marked_slug_is_not_ready() {
        let set = DirtySet::new();
        set.mark("t");
        assert!(set.take_ready(Duration::from_millis(100)).is_empty());
    }

    #[test]
    fn quiet_slug_becomes_ready() {
        let set = DirtySet::new();
        set.mark("t");
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(set.take_ready(Duration::from_millis(10)), vec!["t".to_string()]);
    }

    #[test]
    fn taking_ready_slugs_clears_them() {
        let set = DirtySet::new();
        set.mark("t");
        std::thread::sleep(Duration::from_millis(20));
        set.take_ready(Duration::from_millis(10));
        assert!(set.is_empty());
    }

    #[test]
    fn repeated_marks_reset_the_window() {
        let set = DirtySet::new();
        set.mark("t");
        std::thread::sleep(Duration::from_millis(15));
        set.mark("t"); // burst: still dirty, window restarts
        assert!(set.take_ready(Duration::from_millis(10)).is_empty());
    }
}
