//! Core data model, error types, and configuration shared across the `kg`
//! workspace. No I/O beyond [`config::ProjectConfig::load`].

pub mod config;
pub mod error;
pub mod hash;
pub mod ids;
pub mod model;
pub mod record;

pub use config::ProjectConfig;
pub use error::{KgError, KgResult};
pub use model::{Backlink, Bullet, BulletKind, Node, NodeMeta, VoteTally};
pub use record::{BulletRecord, MetaRecord, VoteSign};
