//! Process-wide services, built once at startup.
//!
//! Optional collaborators degrade instead of failing startup:
//! - CF snapshot missing → CF weights off
//! - embedding snapshot missing → keyword search only
//! - Redis unset or unreachable → in-process cache

use crate::config::AppConfig;
use crate::orchestrator::RecommendationService;
use anyhow::{Context, Result};
use cf_model::CfPredictor;
use data_loader::DataIndex;
use ranking::HybridScorer;
use semantic::{
    Cache, CachedEmbedder, EmbeddingConfig, EmbeddingIndex, HttpEmbedder, InMemoryCache,
    RedisCache, SemanticConfig, SemanticSearchEngine,
};
use sources::{InMemoryStore, MovieStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Headroom over the HTTP timeout before the engine gives up on a query
const EMBED_TIMEOUT_SLACK: Duration = Duration::from_secs(2);

pub struct AppServices {
    pub data_index: Arc<DataIndex>,
    pub store: Arc<dyn MovieStore>,
    pub cf: Arc<CfPredictor>,
    pub recommendations: RecommendationService,
    pub search: Arc<SemanticSearchEngine>,
}

impl AppServices {
    /// Load the catalog and wire every service from `config`
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        let start = Instant::now();

        let data_index = tokio::task::spawn_blocking({
            let data_dir = config.data_dir.clone();
            move || DataIndex::load_from_files(&data_dir)
        })
        .await
        .context("Catalog load task panicked")?
        .with_context(|| format!("Failed to load catalog from {}", config.data_dir.display()))?;
        let data_index = Arc::new(data_index);

        let cf = Arc::new(CfPredictor::new(config.cf_snapshot.clone()));
        let cf_ready = tokio::task::spawn_blocking({
            let cf = cf.clone();
            move || cf.warm_up()
        })
        .await
        .context("CF warm-up task panicked")?;
        if !cf_ready {
            warn!(path = %config.cf_snapshot.display(), "CF model unavailable, CF weights disabled");
        }

        let index = tokio::task::spawn_blocking({
            let dir = config.embeddings_dir.clone();
            move || EmbeddingIndex::load(&dir)
        })
        .await
        .context("Embedding load task panicked")?;
        let index = match index {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                warn!(error = %e, "Embedding index unavailable, search will use keyword fallback");
                None
            }
        };

        let cache = Self::connect_cache(config).await;
        let store: Arc<dyn MovieStore> = Arc::new(InMemoryStore::new(data_index.clone()));

        let services = Self::from_parts(config, data_index, store, cf, index, cache)?;
        info!("Services initialized in {:?}", start.elapsed());
        Ok(services)
    }

    /// Wire services over already-built collaborators
    pub fn from_parts(
        config: &AppConfig,
        data_index: Arc<DataIndex>,
        store: Arc<dyn MovieStore>,
        cf: Arc<CfPredictor>,
        index: Option<Arc<EmbeddingIndex>>,
        cache: Arc<dyn Cache>,
    ) -> Result<Self> {
        let mut recommendations = RecommendationService::new(store.clone(), HybridScorer::new(cf.clone()));
        if !config.diversity_enabled {
            recommendations = recommendations.with_diversity(None);
        }

        let http = HttpEmbedder::new(EmbeddingConfig {
            api_url: config.embedding_api_url.clone(),
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
            timeout: config.embedding_timeout(),
        })
        .context("Failed to build embedding client")?;
        if !http.is_configured() {
            warn!("No embedding API key configured, search will use keyword fallback");
        }
        let embedder = CachedEmbedder::new(Arc::new(http), cache.clone())
            .with_ttl(config.embedding_cache_ttl())
            .with_cache_timeout(config.cache_timeout());

        let semantic_config = SemanticConfig {
            result_ttl: config.search_result_ttl(),
            embed_timeout: config.embedding_timeout() + EMBED_TIMEOUT_SLACK,
            cache_timeout: config.cache_timeout(),
            ..SemanticConfig::default()
        };
        let mut engine =
            SemanticSearchEngine::new(store.clone(), Arc::new(embedder), cache).with_config(semantic_config);
        if let Some(index) = index {
            engine = engine.with_index(index);
        }

        Ok(Self {
            data_index,
            store,
            cf,
            recommendations,
            search: Arc::new(engine),
        })
    }

    async fn connect_cache(config: &AppConfig) -> Arc<dyn Cache> {
        let Some(url) = config.redis_url.as_deref() else {
            info!("No Redis URL configured, using in-process cache");
            return Arc::new(InMemoryCache::new());
        };

        match tokio::time::timeout(Duration::from_secs(5), RedisCache::connect(url)).await {
            Ok(Ok(cache)) => Arc::new(cache),
            Ok(Err(e)) => {
                warn!(error = %e, "Redis unavailable, using in-process cache");
                Arc::new(InMemoryCache::new())
            }
            Err(_) => {
                warn!("Redis connect timed out, using in-process cache");
                Arc::new(InMemoryCache::new())
            }
        }
    }
}
