//! Error types for semantic retrieval.
//!
//! Only [`SearchError`] ever reaches a caller. Cache and embedding errors
//! are logged and turned into a cache miss or a keyword fallback.

use sources::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Cache operation timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding provider is not configured (missing API key)")]
    NotConfigured,

    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("Embedding request timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SearchError>;
