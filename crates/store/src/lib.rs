//! Append-only record store: the on-disk source of truth for nodes and
//! bullets.

pub mod log;
pub mod paths;
pub mod record_store;
pub mod replay;
pub mod writer_lock;

pub use record_store::RecordStore;
pub use replay::{replay_meta, replay_node};
pub use writer_lock::WriterLock;
