//! Best-effort key/value cache.
//!
//! Used for query embeddings and for whole search payloads. The in-process
//! backend is a bounded `moka` cache; Redis is used when configured. A cache
//! miss, a backend error and a timeout all look the same to callers of
//! [`cache_get`] / [`cache_set`]: nothing cached, request carries on.

use crate::error::CacheError;
use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lower-case, trim, and collapse inner whitespace
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Query embedding, keyed by normalized query
    Embedding(String),
    /// Search payload, keyed by normalized query and limit
    SearchResult { query: String, limit: usize },
}

impl CacheKey {
    pub fn embedding(query: &str) -> Self {
        CacheKey::Embedding(normalize_query(query))
    }

    pub fn search_result(query: &str, limit: usize) -> Self {
        CacheKey::SearchResult {
            query: normalize_query(query),
            limit,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Embedding(query) => write!(f, "embedding:{}", query),
            CacheKey::SearchResult { query, limit } => write!(f, "semantic:{}:{}", query, limit),
        }
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Read through `cache`, treating errors and timeouts as a miss
pub async fn cache_get(cache: &dyn Cache, key: &CacheKey, timeout: Duration) -> Option<Vec<u8>> {
    let key = key.to_string();
    match tokio::time::timeout(timeout, cache.get(&key)).await {
        Ok(Ok(hit)) => {
            debug!(key = %key, hit = hit.is_some(), "Cache lookup");
            hit
        }
        Ok(Err(e)) => {
            warn!(key = %key, error = %e, "Cache get failed, treating as miss");
            None
        }
        Err(_) => {
            warn!(key = %key, error = %CacheError::Timeout, "Cache get failed, treating as miss");
            None
        }
    }
}

/// Write to `cache`, logging and swallowing any failure
pub async fn cache_set(
    cache: &dyn Cache,
    key: &CacheKey,
    value: Vec<u8>,
    ttl: Duration,
    timeout: Duration,
) {
    let key = key.to_string();
    match tokio::time::timeout(timeout, cache.set(&key, value, ttl)).await {
        Ok(Ok(())) => debug!(key = %key, "Cache write"),
        Ok(Err(e)) => warn!(key = %key, error = %e, "Cache set failed, skipping"),
        Err(_) => warn!(key = %key, error = %CacheError::Timeout, "Cache set failed, skipping"),
    }
}

// ============================================================================
// In-process cache
// ============================================================================

/// Bytes plus the TTL they were written with
#[derive(Clone)]
struct Entry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires every entry after the TTL given to its last write
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local cache, bounded by entry count, with per-entry expiry
#[derive(Clone)]
pub struct InMemoryCache {
    entries: MokaCache<String, Entry>,
}

impl InMemoryCache {
    pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: u64) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { entries }
    }

    /// Live entries after pending evictions have run
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count() as usize
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).await.map(|entry| entry.bytes.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            bytes: value.into(),
            ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }
}

// ============================================================================
// Redis
// ============================================================================

/// Redis-backed cache. Cloning shares the underlying connection manager.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        tracing::info!("Connected to Redis cache");
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}
