//! Query embedding providers.

use crate::cache::{Cache, CacheKey, cache_get, cache_set};
use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_EMBEDDING_URL: &str = "https://api.voyageai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "voyage-multilingual-2";

/// Turns one piece of text into a vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub model: String,
    /// Without a key every call fails with `NotConfigured`
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
    input_type: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// HTTP client for a Voyage-compatible embeddings endpoint
#[derive(Clone)]
pub struct HttpEmbedder {
    http_client: HttpClient,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let http_client = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    #[instrument(skip(self, text), fields(model = %self.config.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::NotConfigured)?;

        let body = EmbeddingRequest {
            input: [text],
            model: &self.config.model,
            input_type: "query",
        };

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response.text().await.unwrap_or_default().chars().take(200).collect();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::MalformedResponse("empty data array".to_string()))?;

        if embedding.is_empty() {
            return Err(EmbeddingError::MalformedResponse("empty embedding".to_string()));
        }

        debug!(dims = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

// ============================================================================
// Caching decorator
// ============================================================================

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

/// Wraps a provider with a best-effort embedding cache keyed by the
/// normalized query
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
    cache_timeout: Duration,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, cache: Arc<dyn Cache>) -> Self {
        Self {
            inner,
            cache,
            ttl: Duration::from_secs(24 * 60 * 60),
            cache_timeout: Duration::from_millis(500),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = CacheKey::embedding(text);

        if let Some(bytes) = cache_get(self.cache.as_ref(), &key, self.cache_timeout).await
            && let Some(vector) = decode_vector(&bytes)
        {
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        cache_set(
            self.cache.as_ref(),
            &key,
            encode_vector(&vector),
            self.ttl,
            self.cache_timeout,
        )
        .await;
        Ok(vector)
    }
}
