//! Embedding service: a polymorphic provider trait, three
//! concrete providers, a content-addressed cache, and a bounded work queue.

pub mod cache;
pub mod local;
pub mod queue;
pub mod remote;

use kg_core::{KgError, KgResult};

/// Shared capability set every embedding provider implements.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, same order.
    fn embed(&self, batch: &[String]) -> KgResult<Vec<Vec<f32>>>;
    /// Output vector dimensionality.
    fn dim(&self) -> usize;
    /// Stable identifier persisted alongside each embedding row, used to
    /// invalidate rows when the configured model changes.
    fn model_id(&self) -> String;
}

/// The `{local_on_device, remote_A, remote_B}` sum type.
/// Dispatch through this enum rather than `dyn EmbeddingProvider` so the
/// watcher and ranker can match on the provider kind without downcasting
/// (same closed-sum-type preference as `kg_core::BulletKind`).
pub enum Provider {
    LocalOnDevice(local::LocalOnDeviceProvider),
    RemoteA(remote::RemoteProvider),
    RemoteB(remote::RemoteProvider),
}

impl Provider {
    /// Construct a provider from the config's `embeddings.model` string,
    /// e.g. `"local:on-device"`, `"remote_a:text-embedding-3-small"`.
    pub fn from_model_string(model: &str) -> KgResult<Provider> {
        let (prefix, rest) = model
            .split_once(':')
            .ok_or_else(|| KgError::input(format!("malformed embeddings.model: {model}")))?;
        match prefix {
            "local" => Ok(Provider::LocalOnDevice(local::LocalOnDeviceProvider::new(rest))),
            "remote_a" => Ok(Provider::RemoteA(remote::RemoteProvider::new(
                "remote_a", rest,
            ))),
            "remote_b" => Ok(Provider::RemoteB(remote::RemoteProvider::new(
                "remote_b", rest,
            ))),
            other => Err(KgError::input(format!("unknown embedding provider prefix: {other}"))),
        }
    }
}

impl EmbeddingProvider for Provider {
    fn embed(&self, batch: &[String]) -> KgResult<Vec<Vec<f32>>> {
        match self {
            Provider::LocalOnDevice(p) => p.embed(batch),
            Provider::RemoteA(p) | Provider::RemoteB(p) => p.embed(batch),
        }
    }

    fn dim(&self) -> usize {
        match self {
            Provider::LocalOnDevice(p) => p.dim(),
            Provider::RemoteA(p) | Provider::RemoteB(p) => p.dim(),
        }
    }

    fn model_id(&self) -> String {
        match self {
            Provider::LocalOnDevice(p) => p.model_id(),
            Provider::RemoteA(p) | Provider::RemoteB(p) => p.model_id(),
        }
    }
}
