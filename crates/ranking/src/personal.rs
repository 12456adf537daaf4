//! Personal affinity: genre overlap with the user's top genres plus
//! membership in the similarity-neighbor set.

use data_loader::{Genre, Movie, MovieId};
use sources::UserPreferenceProfile;
use std::collections::HashSet;

/// Bonus constants for the personal sub-score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonalAffinityConfig {
    /// How many top genres count as "the user's genres"
    pub top_genre_count: usize,
    pub per_genre_bonus: f32,
    pub genre_bonus_cap: f32,
    /// Added on top of the genre bonus; not capped, so the sub-score may
    /// exceed 1 before weighting
    pub similar_bonus: f32,
}

impl Default for PersonalAffinityConfig {
    fn default() -> Self {
        Self {
            top_genre_count: 3,
            per_genre_bonus: 0.3,
            genre_bonus_cap: 0.9,
            similar_bonus: 0.4,
        }
    }
}

/// Personal sub-score for one movie
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonalScore {
    pub genre_bonus: f32,
    pub matching_genres: usize,
    pub similar: bool,
    pub value: f32,
}

/// Per-request calculator built once from the profile
#[derive(Debug, Clone)]
pub struct PersonalAffinity<'a> {
    top_genres: Vec<Genre>,
    similar_ids: &'a HashSet<MovieId>,
    config: PersonalAffinityConfig,
}

impl<'a> PersonalAffinity<'a> {
    pub fn new(profile: &'a UserPreferenceProfile, config: PersonalAffinityConfig) -> Self {
        Self {
            top_genres: profile.top_genres(config.top_genre_count),
            similar_ids: &profile.similar_ids,
            config,
        }
    }

    pub fn top_genres(&self) -> &[Genre] {
        &self.top_genres
    }

    pub fn score(&self, movie: &Movie) -> PersonalScore {
        let matching_genres = self
            .top_genres
            .iter()
            .filter(|g| movie.genres.contains(*g))
            .count();
        let genre_bonus =
            (matching_genres as f32 * self.config.per_genre_bonus).min(self.config.genre_bonus_cap);
        let similar = self.similar_ids.contains(&movie.id);
        let value = genre_bonus + if similar { self.config.similar_bonus } else { 0.0 };

        PersonalScore {
            genre_bonus,
            matching_genres,
            similar,
            value,
        }
    }
}
