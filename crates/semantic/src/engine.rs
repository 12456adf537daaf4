//! Semantic search engine.
//!
//! ## Flow
//! 1. Result cache (normalized query + limit)
//! 2. No index loaded → keyword fallback
//! 3. Embed the query (bounded timeout) → on failure, keyword fallback
//! 4. Top-k vector search over the index
//! 5. Fetch metadata, drop titles under the quality floor
//! 6. Rerank by composite relevance, optional per-genre cap
//! 7. Cache the payload and return it
//!
//! Only store failures surface as errors.

use crate::cache::{Cache, CacheKey, cache_get, cache_set, normalize_query};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::EmbeddingIndex;
use crate::relevance::RelevanceWeights;
use data_loader::{Movie, MovieId};
use ranking::cap_by_key;
use serde::{Deserialize, Serialize};
use sources::{MovieFilter, MovieStore, Page, SortOrder};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SemanticConfig {
    /// Vector hits kept before metadata fetch
    pub top_k: usize,
    /// Hits with a lower weighted score are dropped
    pub min_quality: f32,
    /// Per-primary-genre cap on the final list; `None` disables it
    pub max_per_genre: Option<usize>,
    pub relevance: RelevanceWeights,
    pub result_ttl: Duration,
    pub embed_timeout: Duration,
    pub cache_timeout: Duration,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            top_k: 300,
            min_quality: 5.0,
            max_per_genre: Some(5),
            relevance: RelevanceWeights::default(),
            result_ttl: Duration::from_secs(60 * 60),
            embed_timeout: Duration::from_secs(12),
            cache_timeout: Duration::from_millis(500),
        }
    }
}

impl SemanticConfig {
    pub fn with_max_per_genre(mut self, max: Option<usize>) -> Self {
        self.max_per_genre = max;
        self
    }

    pub fn with_min_quality(mut self, min_quality: f32) -> Self {
        self.min_quality = min_quality;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticHit {
    pub movie: Movie,
    /// Cosine similarity; 0 for keyword matches
    pub similarity: f32,
    /// Composite relevance; 0 for keyword matches
    pub relevance: f32,
}

/// Milliseconds spent per stage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SearchTiming {
    pub embedding_ms: f64,
    pub search_ms: f64,
    pub rerank_ms: f64,
    pub total_ms: f64,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSearchResponse {
    pub query: String,
    pub results: Vec<SemanticHit>,
    pub total: usize,
    /// Results came from keyword matching instead of vector search
    pub fallback: bool,
    /// Payload was served from the result cache
    pub cached: bool,
    pub timing: SearchTiming,
}

pub struct SemanticSearchEngine {
    store: Arc<dyn MovieStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn Cache>,
    index: Option<Arc<EmbeddingIndex>>,
    config: SemanticConfig,
}

impl SemanticSearchEngine {
    /// Engine without an index; every search is a keyword search until
    /// [`with_index`](Self::with_index) is called
    pub fn new(
        store: Arc<dyn MovieStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        Self {
            store,
            embedder,
            cache,
            index: None,
            config: SemanticConfig::default(),
        }
    }

    pub fn with_index(mut self, index: Arc<EmbeddingIndex>) -> Self {
        self.index = Some(index).filter(|i| !i.is_empty());
        self
    }

    pub fn with_config(mut self, config: SemanticConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_available(&self) -> bool {
        self.index.is_some()
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<SemanticSearchResponse> {
        let started = Instant::now();
        let normalized = normalize_query(query);
        if normalized.is_empty() || limit == 0 {
            return Ok(SemanticSearchResponse {
                query: query.to_string(),
                results: Vec::new(),
                total: 0,
                fallback: false,
                cached: false,
                timing: SearchTiming::default(),
            });
        }

        let key = CacheKey::search_result(query, limit);
        if let Some(bytes) = cache_get(self.cache.as_ref(), &key, self.config.cache_timeout).await {
            match serde_json::from_slice::<SemanticSearchResponse>(&bytes) {
                Ok(mut response) => {
                    response.cached = true;
                    response.timing = SearchTiming {
                        total_ms: millis(started.elapsed()),
                        ..SearchTiming::default()
                    };
                    debug!(results = response.total, "Serving cached search");
                    return Ok(response);
                }
                Err(e) => warn!(error = %e, "Discarding unreadable cached search payload"),
            }
        }

        let Some(index) = self.index.as_ref() else {
            debug!("No embedding index loaded, using keyword search");
            return self.keyword_search(query, limit, started).await;
        };

        let embed_started = Instant::now();
        let vector = match tokio::time::timeout(self.config.embed_timeout, self.embedder.embed(query)).await {
            Ok(Ok(vector)) if vector.len() == index.dims() && is_usable(&vector) => vector,
            Ok(Ok(vector)) if vector.len() == index.dims() => {
                warn!("Query embedding is zero or non-finite, using keyword search");
                return self.keyword_search(query, limit, started).await;
            }
            Ok(Ok(vector)) => {
                warn!(
                    got = vector.len(),
                    expected = index.dims(),
                    "Embedding dimension mismatch, using keyword search"
                );
                return self.keyword_search(query, limit, started).await;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Query embedding failed, using keyword search");
                return self.keyword_search(query, limit, started).await;
            }
            Err(_) => {
                warn!("Query embedding timed out, using keyword search");
                return self.keyword_search(query, limit, started).await;
            }
        };
        let embedding_ms = millis(embed_started.elapsed());

        let search_started = Instant::now();
        let top_k = self.config.top_k;
        let scan = Arc::clone(index);
        let neighbors = match tokio::task::spawn_blocking(move || scan.search(&vector, top_k)).await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(error = %e, "Vector search task failed, using keyword search");
                return self.keyword_search(query, limit, started).await;
            }
        };
        let search_ms = millis(search_started.elapsed());

        let rerank_started = Instant::now();
        let results = self.rerank(neighbors, limit).await?;
        let rerank_ms = millis(rerank_started.elapsed());

        let response = SemanticSearchResponse {
            query: query.to_string(),
            total: results.len(),
            results,
            fallback: false,
            cached: false,
            timing: SearchTiming {
                embedding_ms,
                search_ms,
                rerank_ms,
                total_ms: millis(started.elapsed()),
            },
        };

        match serde_json::to_vec(&response) {
            Ok(bytes) => {
                cache_set(
                    self.cache.as_ref(),
                    &key,
                    bytes,
                    self.config.result_ttl,
                    self.config.cache_timeout,
                )
                .await
            }
            Err(e) => warn!(error = %e, "Could not serialize search payload for caching"),
        }

        info!(
            results = response.total,
            total_ms = response.timing.total_ms,
            "Semantic search complete"
        );
        Ok(response)
    }

    async fn rerank(&self, neighbors: Vec<(MovieId, f32)>, limit: usize) -> Result<Vec<SemanticHit>> {
        let similarity: HashMap<MovieId, f32> = neighbors.iter().copied().collect();
        let ids: Vec<MovieId> = neighbors.into_iter().map(|(id, _)| id).collect();
        let movies = self.store.fetch_by_ids(&ids).await?;

        let weights = &self.config.relevance;
        let mut hits: Vec<SemanticHit> = movies
            .into_iter()
            .filter(|m| m.weighted_score >= self.config.min_quality)
            .map(|movie| {
                let similarity = similarity.get(&movie.id).copied().unwrap_or(0.0);
                let relevance = weights.score(similarity, &movie);
                SemanticHit {
                    movie,
                    similarity,
                    relevance,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });

        Ok(match self.config.max_per_genre {
            Some(max) => cap_by_key(hits, limit, max, |h| h.movie.primary_genre()),
            None => {
                hits.truncate(limit);
                hits
            }
        })
    }

    /// Case-insensitive title match ordered by popularity
    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        started: Instant,
    ) -> Result<SemanticSearchResponse> {
        let filter = MovieFilter::new().with_title_contains(normalize_query(query));
        let movies = self
            .store
            .query(&filter, SortOrder::Popularity, Page::first(limit))
            .await?;

        let results: Vec<SemanticHit> = movies
            .into_iter()
            .map(|movie| SemanticHit {
                movie,
                similarity: 0.0,
                relevance: 0.0,
            })
            .collect();

        Ok(SemanticSearchResponse {
            query: query.to_string(),
            total: results.len(),
            results,
            fallback: true,
            cached: false,
            timing: SearchTiming {
                total_ms: millis(started.elapsed()),
                ..SearchTiming::default()
            },
        })
    }
}

/// A query vector can only be ranked by cosine similarity when it has a direction
fn is_usable(vector: &[f32]) -> bool {
    vector.iter().all(|v| v.is_finite()) && vector.iter().any(|v| *v != 0.0)
}
