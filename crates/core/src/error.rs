//! Unified error type.
//!
//! `KgError` groups the six error kinds spec.md §7 names into one
//! `thiserror`-derived enum with classification methods, the same shape the
//! teacher workspace uses for `StrataError`: one enum, one set of
//! `is_*` predicates callers can match on without enumerating variants.

use std::path::PathBuf;
use thiserror::Error;

/// A single error surfaced anywhere in the kg workspace.
#[derive(Debug, Error)]
pub enum KgError {
    /// Bad slug, unknown bullet id, malformed query. Reported, not retried.
    #[error("input error: {0}")]
    InputError(String),

    /// Derived store cannot be opened, or both retrieval channels failed.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// Schema mismatch or corrupt derived file. Triggers automatic
    /// drop-and-rebuild on open; this variant carries the one-line notice
    /// shown to the user, it is not itself fatal.
    #[error("index stale, rebuilding: {0}")]
    IndexStale(String),

    /// Embedding or cross-encoder network failure. Retried with backoff by
    /// the caller; once retries are exhausted the channel is disabled for
    /// that query and results are annotated partial.
    #[error("provider transient error ({provider}): {message}")]
    ProviderTransient { provider: String, message: String },

    /// Bad API key, unknown model. Surfaced once; the channel stays
    /// disabled until configuration changes.
    #[error("provider hard failure ({provider}): {message}")]
    ProviderHardFailure { provider: String, message: String },

    /// Another process holds the writer lock. Reported immediately.
    #[error("writer conflict: another process holds the lock on {0}")]
    WriterConflict(PathBuf),

    /// Underlying I/O failure not otherwise classified above.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure not otherwise classified above.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration parse failure.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl KgError {
    pub fn input<S: Into<String>>(msg: S) -> Self {
        KgError::InputError(msg.into())
    }

    pub fn index_unavailable<S: Into<String>>(msg: S) -> Self {
        KgError::IndexUnavailable(msg.into())
    }

    pub fn provider_transient<S: Into<String>, M: Into<String>>(provider: S, message: M) -> Self {
        KgError::ProviderTransient {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_hard_failure<S: Into<String>, M: Into<String>>(
        provider: S,
        message: M,
    ) -> Self {
        KgError::ProviderHardFailure {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Input errors and hard provider failures are not worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KgError::ProviderTransient { .. } | KgError::IndexStale(_))
    }

    /// Conditions severe enough that the caller should stop and surface a
    /// message rather than quietly degrade.
    pub fn is_serious(&self) -> bool {
        matches!(
            self,
            KgError::IndexUnavailable(_) | KgError::ProviderHardFailure { .. } | KgError::WriterConflict(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, KgError::InputError(msg) if msg.contains("not found"))
    }

    pub fn is_writer_conflict(&self) -> bool {
        matches!(self, KgError::WriterConflict(_))
    }

    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            KgError::InputError(_) => 2,
            KgError::IndexUnavailable(_) | KgError::IndexStale(_) => 3,
            KgError::WriterConflict(_) => 4,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type KgResult<T> = Result<T, KgError>;
