//! The indexer, schema/migration, and budget accountant: everything that projects `kg-store`'s record logs into the
//! derived store the ranker reads from.

pub mod backlinks;
pub mod budget;
pub mod indexer;
pub mod schema;

pub use budget::BudgetAccountant;
pub use indexer::{DerivedStore, EmbeddingRow, PendingEmbed};
