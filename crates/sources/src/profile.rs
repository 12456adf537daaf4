//! User preference profile
//!
//! Everything the scorer needs to know about a user, gathered once per
//! request from the catalog history:
//! - favorited movies (excluded from candidates, counted ×1 per genre)
//! - recent high ratings (counted ×2 per genre)
//! - neighbors of both in the precomputed similarity graph
//! - experiment group and personality label

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use data_loader::{DataIndex, ExperimentGroup, Genre, MovieId, PersonalityType, UserId};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Preference signals for one user
#[derive(Debug, Clone, Default)]
pub struct UserPreferenceProfile {
    pub user_id: Option<UserId>,
    pub favorites: HashSet<MovieId>,
    /// Weighted genre counts from favorites and recent high ratings
    pub genre_counts: HashMap<Genre, u32>,
    pub experiment_group: ExperimentGroup,
    pub personality: Option<PersonalityType>,
    /// Movies linked to the user's favorites or high ratings
    pub similar_ids: HashSet<MovieId>,
}

impl UserPreferenceProfile {
    /// Profile with no history, e.g. for anonymous requests
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_experiment_group(mut self, group: ExperimentGroup) -> Self {
        self.experiment_group = group;
        self
    }

    pub fn with_personality(mut self, personality: PersonalityType) -> Self {
        self.personality = Some(personality);
        self
    }

    pub fn with_genre_count(mut self, genre: Genre, count: u32) -> Self {
        self.genre_counts.insert(genre, count);
        self
    }

    pub fn with_favorites(mut self, ids: impl IntoIterator<Item = MovieId>) -> Self {
        self.favorites.extend(ids);
        self
    }

    pub fn with_similar_ids(mut self, ids: impl IntoIterator<Item = MovieId>) -> Self {
        self.similar_ids.extend(ids);
        self
    }

    /// The `n` most-counted genres, highest count first.
    ///
    /// Ties are broken by genre declaration order so the result is stable.
    pub fn top_genres(&self, n: usize) -> Vec<Genre> {
        let mut genres: Vec<(Genre, u32)> = self
            .genre_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(g, c)| (*g, *c))
            .collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        genres.into_iter().take(n).map(|(g, _)| g).collect()
    }
}

/// Knobs for profile building
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Ratings at or above this count as "high"
    pub high_rating_threshold: f32,
    /// Only high ratings newer than this count
    pub recency_window: Duration,
    pub favorite_weight: u32,
    pub high_rating_weight: u32,
    /// Cap on the similarity-neighbor set
    pub max_similar: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            high_rating_threshold: 4.0,
            recency_window: Duration::days(90),
            favorite_weight: 1,
            high_rating_weight: 2,
            max_similar: 50,
        }
    }
}

/// Build a preference profile from the catalog history
#[instrument(skip(data_index, config))]
pub fn build_preference_profile(
    data_index: &DataIndex,
    user_id: UserId,
    now: DateTime<Utc>,
    config: &ProfileConfig,
) -> Result<UserPreferenceProfile> {
    let user = data_index
        .get_user(user_id)
        .ok_or_else(|| anyhow!("User {} not found", user_id))?;

    let mut profile = UserPreferenceProfile {
        user_id: Some(user_id),
        experiment_group: user.experiment_group,
        personality: user.personality,
        ..Default::default()
    };

    let favorites = data_index.get_favorites(user_id);
    profile.favorites.extend(favorites.iter().copied());

    let cutoff = (now - config.recency_window).timestamp();
    let high_ratings: Vec<MovieId> = data_index
        .get_user_ratings(user_id)
        .iter()
        .filter(|r| r.rating >= config.high_rating_threshold && r.timestamp >= cutoff)
        .map(|r| r.movie_id)
        .collect();

    let weighted_sources = favorites
        .iter()
        .map(|id| (*id, config.favorite_weight))
        .chain(high_ratings.iter().map(|id| (*id, config.high_rating_weight)));
    for (movie_id, weight) in weighted_sources {
        if let Some(movie) = data_index.get_movie(movie_id) {
            for genre in &movie.genres {
                *profile.genre_counts.entry(*genre).or_insert(0) += weight;
            }
        }
    }

    // Neighbors in seed order: favorites first, then high ratings
    let mut seen = HashSet::new();
    for seed in favorites.iter().chain(high_ratings.iter()) {
        for &neighbor in data_index.get_similar(*seed) {
            if profile.similar_ids.len() >= config.max_similar {
                break;
            }
            if seen.insert(neighbor) {
                profile.similar_ids.insert(neighbor);
            }
        }
    }

    debug!(
        favorites = profile.favorites.len(),
        high_ratings = high_ratings.len(),
        similar = profile.similar_ids.len(),
        "Built preference profile"
    );
    Ok(profile)
}
