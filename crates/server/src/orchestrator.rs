//! Recommendation orchestration.
//!
//! One request runs through:
//! 1. Candidate pool fetch (store)
//! 2. Hybrid scoring (blocking pool)
//! 3. Diversity passes over the whole scored pool
//! 4. Truncation to the requested size
//! 5. Optional serendipity injection
//! 6. Reason generation

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use data_loader::{Genre, MovieId};
use rand::Rng;
use ranking::{
    DiversityPipeline, HybridScorer, RequestSignals, ScoredCandidate, SerendipityConfig, Tag,
    default_diversity_pipeline, generate_reason, inject_serendipity,
};
use serde::Serialize;
use sources::{
    AgeRating, CandidatePoolConfig, MovieStore, UserPreferenceProfile, fetch_candidates,
    fetch_serendipity_pool,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Per-request options
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest {
    pub limit: usize,
    pub signals: RequestSignals,
    pub age_rating: Option<AgeRating>,
    /// Mix out-of-taste picks into the tail of the list
    pub serendipity: bool,
}

impl RecommendationRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            signals: RequestSignals::default(),
            age_rating: None,
            serendipity: false,
        }
    }

    pub fn with_signals(mut self, signals: RequestSignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_age_rating(mut self, age_rating: AgeRating) -> Self {
        self.age_rating = Some(age_rating);
        self
    }

    pub fn with_serendipity(mut self, enabled: bool) -> Self {
        self.serendipity = enabled;
        self
    }
}

/// Final recommendation with explanation
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<Genre>,
    pub release_year: Option<i32>,
    pub score: f32,
    pub tags: Vec<Tag>,
    pub reason: String,
}

impl Recommendation {
    fn from_candidate(candidate: ScoredCandidate, reason: String) -> Self {
        let release_year = candidate.movie.release_year();
        Self {
            movie_id: candidate.movie.id,
            title: candidate.movie.title,
            genres: candidate.movie.genres,
            release_year,
            score: candidate.score,
            tags: candidate.tags,
            reason,
        }
    }

    pub fn tag_labels(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.label.as_str()).collect()
    }
}

/// Hybrid recommendation service.
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn MovieStore>,
    scorer: HybridScorer,
    pool: CandidatePoolConfig,
    diversity: Option<Arc<DiversityPipeline>>,
    serendipity: SerendipityConfig,
    current_year: Option<i32>,
}

impl RecommendationService {
    /// Service with the default pool, the default diversity chain and
    /// default serendipity settings
    pub fn new(store: Arc<dyn MovieStore>, scorer: HybridScorer) -> Self {
        Self {
            store,
            scorer,
            pool: CandidatePoolConfig::default(),
            diversity: Some(Arc::new(default_diversity_pipeline())),
            serendipity: SerendipityConfig::default(),
            current_year: None,
        }
    }

    pub fn with_pool_config(mut self, pool: CandidatePoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Replace the diversity chain; `None` turns diversity off
    pub fn with_diversity(mut self, pipeline: Option<DiversityPipeline>) -> Self {
        self.diversity = pipeline.map(Arc::new);
        self
    }

    pub fn with_serendipity(mut self, config: SerendipityConfig) -> Self {
        self.serendipity = config;
        self
    }

    /// Pin the year used by reason templates
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn diversity_enabled(&self) -> bool {
        self.diversity.is_some()
    }

    /// Recommend up to `request.limit` movies for `profile`
    #[instrument(skip(self, profile, rng), fields(user_id = ?profile.user_id, limit = request.limit))]
    pub async fn recommend<R>(
        &self,
        profile: &UserPreferenceProfile,
        request: RecommendationRequest,
        rng: &mut R,
    ) -> Result<Vec<Recommendation>>
    where
        R: Rng + Send + ?Sized,
    {
        let start = Instant::now();

        if request.limit == 0 {
            return Ok(Vec::new());
        }

        // Step 1: Candidate pool
        let movies = fetch_candidates(
            self.store.as_ref(),
            profile,
            request.age_rating,
            &self.pool,
        )
        .await
        .context("Failed to fetch candidate pool")?;
        info!(
            "Fetched {} candidates in {:?}",
            movies.len(),
            start.elapsed()
        );

        if movies.is_empty() {
            return Ok(Vec::new());
        }

        // Step 2: Scoring
        let scoring_start = Instant::now();
        let scored = tokio::task::spawn_blocking({
            let scorer = self.scorer.clone();
            let profile = profile.clone();
            let signals = request.signals;
            move || scorer.score(movies, &profile, &signals)
        })
        .await
        .context("Scoring task panicked")?;
        info!(
            "Scored {} candidates in {:?}",
            scored.len(),
            scoring_start.elapsed()
        );

        // Step 3: Diversity over the whole pool, then cut to size
        let mut ranked = match &self.diversity {
            Some(pipeline) => {
                let pool_len = scored.len();
                pipeline.apply(scored, pool_len)
            }
            None => scored,
        };
        ranked.truncate(request.limit);

        // Step 4: Serendipity
        if request.serendipity {
            ranked = self.add_serendipity(ranked, profile, request.limit, rng).await?;
        }

        // Step 5: Reasons
        let year = self.current_year.unwrap_or_else(|| Utc::now().year());
        let recommendations: Vec<Recommendation> = ranked
            .into_iter()
            .map(|candidate| {
                let reason = generate_reason(&candidate, &request.signals, year);
                Recommendation::from_candidate(candidate, reason)
            })
            .collect();

        info!(
            "Returned {} recommendations in {:?}",
            recommendations.len(),
            start.elapsed()
        );
        Ok(recommendations)
    }

    async fn add_serendipity<R>(
        &self,
        ranked: Vec<ScoredCandidate>,
        profile: &UserPreferenceProfile,
        limit: usize,
        rng: &mut R,
    ) -> Result<Vec<ScoredCandidate>>
    where
        R: Rng + Send + ?Sized,
    {
        let top_genres = profile.top_genres(self.scorer.config().personal.top_genre_count);
        if top_genres.is_empty() || self.serendipity.count(limit) == 0 {
            debug!("Skipping serendipity: no taste profile");
            return Ok(ranked);
        }

        let exclude: HashSet<MovieId> = ranked
            .iter()
            .map(|c| c.id())
            .chain(profile.favorites.iter().copied())
            .collect();

        let pool = match fetch_serendipity_pool(
            self.store.as_ref(),
            &top_genres,
            &exclude,
            self.serendipity.min_quality,
            self.serendipity.pool_size(limit),
        )
        .await
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!(error = %e, "Serendipity pool unavailable, skipping injection");
                return Ok(ranked);
            }
        };

        debug!(pool = pool.len(), "Injecting serendipity");
        Ok(inject_serendipity(
            ranked,
            limit,
            pool,
            &top_genres,
            &self.serendipity,
            rng,
        ))
    }
}
