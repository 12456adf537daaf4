//! Runtime configuration.
//!
//! Read from `REELMIX_*` environment variables after an optional `.env`
//! file is loaded. Every field has a default, so an empty environment
//! yields a working local setup over `data/`.

use anyhow::{Context, Result};
use semantic::embedding::{DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "REELMIX_";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory holding the catalog files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// CF bias snapshot (JSON)
    #[serde(default = "default_cf_snapshot")]
    pub cf_snapshot: PathBuf,

    /// Directory with `movie_embeddings.npy` and `movie_id_index.json`
    #[serde(default = "default_embeddings_dir")]
    pub embeddings_dir: PathBuf,

    /// Falls back to an in-process cache when unset or unreachable
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default)]
    pub embedding_api_key: Option<String>,

    #[serde(default = "default_embedding_api_url")]
    pub embedding_api_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,

    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    #[serde(default = "default_embedding_cache_ttl_secs")]
    pub embedding_cache_ttl_secs: u64,

    #[serde(default = "default_search_result_ttl_secs")]
    pub search_result_ttl_secs: u64,

    #[serde(default = "default_diversity_enabled")]
    pub diversity_enabled: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_cf_snapshot() -> PathBuf {
    PathBuf::from("data/cf_model.json")
}

fn default_embeddings_dir() -> PathBuf {
    PathBuf::from("data/embeddings")
}

fn default_embedding_api_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    10
}

fn default_cache_timeout_ms() -> u64 {
    500
}

fn default_embedding_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_search_result_ttl_secs() -> u64 {
    60 * 60
}

fn default_diversity_enabled() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cf_snapshot: default_cf_snapshot(),
            embeddings_dir: default_embeddings_dir(),
            redis_url: None,
            embedding_api_key: None,
            embedding_api_url: default_embedding_api_url(),
            embedding_model: default_embedding_model(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
            cache_timeout_ms: default_cache_timeout_ms(),
            embedding_cache_ttl_secs: default_embedding_cache_ttl_secs(),
            search_result_ttl_secs: default_search_result_ttl_secs(),
            diversity_enabled: default_diversity_enabled(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and then the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build from explicit key/value pairs; only `REELMIX_*` keys are read
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to load REELMIX_* configuration")
    }

    /// Point every data path below `dir`, keeping the default file names
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cf_snapshot = dir.join("cf_model.json");
        self.embeddings_dir = dir.join("embeddings");
        self.data_dir = dir;
        self
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn embedding_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.embedding_cache_ttl_secs)
    }

    pub fn search_result_ttl(&self) -> Duration {
        Duration::from_secs(self.search_result_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = AppConfig::from_vars(vars(&[("PATH", "/usr/bin")])).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.redis_url, None);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.embedding_cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.cache_timeout(), Duration::from_millis(500));
        assert!(config.diversity_enabled);
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = AppConfig::from_vars(vars(&[
            ("REELMIX_DATA_DIR", "/srv/catalog"),
            ("REELMIX_REDIS_URL", "redis://cache:6379"),
            ("REELMIX_DIVERSITY_ENABLED", "false"),
            ("REELMIX_EMBEDDING_TIMEOUT_SECS", "3"),
            ("DATA_DIR", "/ignored"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/catalog"));
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert!(!config.diversity_enabled);
        assert_eq!(config.embedding_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_bad_value_is_an_error() {
        let result = AppConfig::from_vars(vars(&[("REELMIX_CACHE_TIMEOUT_MS", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_data_dir_moves_snapshots() {
        let config = AppConfig::default().with_data_dir("/tmp/reel");
        assert_eq!(config.cf_snapshot, PathBuf::from("/tmp/reel/cf_model.json"));
        assert_eq!(config.embeddings_dir, PathBuf::from("/tmp/reel/embeddings"));
    }
}
