//! Command dispatch layer: opens a project root and serves
//! `context`/`search`/`show`/`add_bullet`/`mark_reviewed` plus the admin
//! operations (`status`, `reindex`, `calibrate`) a CLI or tool-protocol
//! server needs. `kg-cli` is the thin argument-parsing shell over this.

pub mod command;
pub mod daemon;
pub mod executor;
pub mod output;

pub use command::Command;
pub use daemon::serve;
pub use executor::Executor;
pub use output::{NodeStatus, Output, SearchHitOut, StatusReport};
