//! Candidate pools fetched from the store
//!
//! Two pools feed a recommendation request:
//! - the hybrid candidate pool (quality floor, favorites excluded, optional
//!   certification allow-list, most popular first)
//! - the serendipity pool (high quality, outside the user's top genres)

use crate::certification::AgeRating;
use crate::profile::UserPreferenceProfile;
use crate::store::{MovieFilter, MovieStore, Page, SortOrder, StoreError};
use data_loader::{Genre, Movie, MovieId};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Hybrid candidate pool settings
#[derive(Debug, Clone)]
pub struct CandidatePoolConfig {
    pub min_quality: f32,
    pub limit: usize,
    pub order: SortOrder,
}

impl Default for CandidatePoolConfig {
    fn default() -> Self {
        Self {
            min_quality: 6.0,
            limit: 200,
            order: SortOrder::Popularity,
        }
    }
}

impl CandidatePoolConfig {
    pub fn with_min_quality(mut self, min_quality: f32) -> Self {
        self.min_quality = min_quality;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Store filter for this user and audience
    pub fn filter_for(
        &self,
        profile: &UserPreferenceProfile,
        age_rating: Option<AgeRating>,
    ) -> MovieFilter {
        let mut filter = MovieFilter::new()
            .with_min_quality(self.min_quality)
            .with_excluded_ids(profile.favorites.iter().copied());
        if let Some(allowed) = age_rating.and_then(AgeRating::allowed_certifications) {
            filter = filter.with_certifications(allowed.iter().copied());
        }
        filter
    }
}

/// Fetch the hybrid candidate pool
#[instrument(skip(store, profile, config), fields(user_id = ?profile.user_id))]
pub async fn fetch_candidates(
    store: &dyn MovieStore,
    profile: &UserPreferenceProfile,
    age_rating: Option<AgeRating>,
    config: &CandidatePoolConfig,
) -> Result<Vec<Movie>, StoreError> {
    let filter = config.filter_for(profile, age_rating);
    let movies = store
        .query(&filter, config.order, Page::first(config.limit))
        .await?;
    debug!(candidates = movies.len(), "Fetched candidate pool");
    Ok(movies)
}

/// Fetch up to `size` high-quality movies outside `top_genres`
#[instrument(skip(store, top_genres, exclude_ids))]
pub async fn fetch_serendipity_pool(
    store: &dyn MovieStore,
    top_genres: &[Genre],
    exclude_ids: &HashSet<MovieId>,
    min_quality: f32,
    size: usize,
) -> Result<Vec<Movie>, StoreError> {
    let filter = MovieFilter::new()
        .with_min_quality(min_quality)
        .with_excluded_genres(top_genres.iter().copied())
        .with_excluded_ids(exclude_ids.iter().copied());
    store
        .query(&filter, SortOrder::Popularity, Page::first(size))
        .await
}
