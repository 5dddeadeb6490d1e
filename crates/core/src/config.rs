//! Project configuration.
//!
//! `spec.md` §6 names the configuration table but leaves loading and
//! defaults unspecified. Loaded from `<root>/kg.toml` via `toml` + `serde`,
//! mirroring the teacher's tolerant `DatabaseConfig::default()` path: a
//! missing file is not an error, just the all-defaults config.

use crate::error::KgResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `embeddings.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Provider-prefixed model string, e.g. `"local:all-minilm"` or
    /// `"remote_a:text-embedding-3-small"`.
    pub model: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        EmbeddingsConfig {
            model: "local:on-device".to_string(),
        }
    }
}

/// `search.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub fts_weight: f32,
    pub vector_weight: f32,
    pub dual_match_bonus: f32,
    pub use_reranker: bool,
    pub reranker_model: String,
    pub auto_calibrate_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            fts_weight: 0.5,
            vector_weight: 0.5,
            dual_match_bonus: 0.1,
            use_reranker: false,
            reranker_model: String::new(),
            auto_calibrate_threshold: 0.05,
        }
    }
}

/// `review.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub budget_threshold: u64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        ReviewConfig {
            budget_threshold: 3000,
        }
    }
}

/// `server.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub vector_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 7420,
            vector_port: 7421,
        }
    }
}

/// One entry of the repeated `sources` table: a file-source indexed as
/// synthetic `_doc-`-prefixed nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub use_git: bool,
}

/// The full project configuration table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub embeddings: EmbeddingsConfig,
    pub search: SearchConfig,
    pub review: ReviewConfig,
    pub server: ServerConfig,
    pub sources: Vec<SourceConfig>,
}

impl ProjectConfig {
    /// Load `<root>/kg.toml`. A missing file yields `ProjectConfig::default()`,
    /// not an error — only a malformed file is an error.
    pub fn load(root: &Path) -> KgResult<ProjectConfig> {
        let path = root.join("kg.toml");
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let cfg: ProjectConfig = toml::from_str(&contents)?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no kg.toml found, using defaults");
                Ok(ProjectConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}
