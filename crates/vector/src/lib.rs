//! ANN vector server over bullet embeddings.

pub mod distance;
pub mod hnsw;
pub mod server;

pub use distance::{compute_similarity, cosine_similarity, normalize, DistanceMetric};
pub use hnsw::HnswIndex;
pub use server::{EmbeddingRow, VectorServer, VectorServerHandle};
