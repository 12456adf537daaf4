//! # Semantic Crate
//!
//! Natural-language movie retrieval over a precomputed embedding index.
//!
//! A query is embedded by an [`EmbeddingProvider`], matched against the
//! L2-normalized [`EmbeddingIndex`], and the nearest movies are reranked by
//! a composite of similarity, popularity and quality. Without an index, or
//! when the provider fails, the engine answers with a title keyword search
//! and flags the response as a fallback.
//!
//! ```ignore
//! let engine = SemanticSearchEngine::new(store, embedder, cache)
//!     .with_index(Arc::new(EmbeddingIndex::load(dir)?));
//! let response = engine.search("slow-burn space mystery", 20).await?;
//! ```

pub mod cache;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod relevance;

pub use cache::{Cache, CacheKey, InMemoryCache, RedisCache, normalize_query};
pub use embedding::{CachedEmbedder, EmbeddingConfig, EmbeddingProvider, HttpEmbedder};
pub use engine::{
    SearchTiming, SemanticConfig, SemanticHit, SemanticSearchEngine, SemanticSearchResponse,
};
pub use error::{CacheError, EmbeddingError, Result, SearchError};
pub use index::EmbeddingIndex;
pub use relevance::RelevanceWeights;
