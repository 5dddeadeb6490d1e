//! Filesystem watcher: debounced dirty-slug coalescing,
//! retry-with-backoff on index-write failure, and status-file error
//! reporting. The only writer of the derived store in a running process
//!.

pub mod dirty;
pub mod retry;
pub mod signal;
pub mod status;
pub mod watcher;

pub use dirty::DirtySet;
pub use retry::Backoff;
pub use signal::SignalFlags;
pub use status::{StatusEntry, StatusFile};
pub use watcher::{Watcher, WatcherConfig};
