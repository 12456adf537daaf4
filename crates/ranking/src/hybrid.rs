//! Hybrid scorer.
//!
//! Blends five sub-scores, each in [0, 1] except personal (up to 1.3):
//!
//! ```text
//! raw   = w_personality·personality + w_context·context + w_mood·mood
//!       + w_personal·personal + w_cf·cf
//! raw  += popularity bonus            (popularity above threshold)
//! final = clamp(raw · quality_factor(weighted_score), 0, 1)
//! ```
//!
//! Tags are emitted when a sub-score clears the tag threshold. They are
//! observational only.

use crate::personal::{PersonalAffinity, PersonalAffinityConfig};
use crate::types::{RequestSignals, ScoredCandidate, Tag};
use crate::weights::{WeightTable, WeightVector};
use cf_model::CfPredictor;
use data_loader::{Mood, Movie};
use rayon::prelude::*;
use sources::UserPreferenceProfile;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Multiplier interpolated linearly from `floor` to `ceiling` as the
/// weighted score moves from `lower` to `upper`; clamped outside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityCorrection {
    pub floor: f32,
    pub ceiling: f32,
    pub lower: f32,
    pub upper: f32,
}

impl Default for QualityCorrection {
    fn default() -> Self {
        Self {
            floor: 0.85,
            ceiling: 1.0,
            lower: 6.0,
            upper: 9.0,
        }
    }
}

impl QualityCorrection {
    pub fn factor(&self, weighted_score: f32) -> f32 {
        let span = self.upper - self.lower;
        let ratio = if span > 0.0 {
            ((weighted_score - self.lower) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.floor + (self.ceiling - self.floor) * ratio
    }
}

/// Flat bonus for very popular titles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityBoost {
    /// Strictly above this popularity earns the bonus
    pub threshold: f32,
    pub bonus: f32,
}

impl Default for PopularityBoost {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            bonus: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub quality: QualityCorrection,
    pub popularity: PopularityBoost,
    pub personal: PersonalAffinityConfig,
    /// Sub-scores strictly above this produce a tag
    pub tag_threshold: f32,
    /// `#TasteMatch` needs at least this many matching top genres
    pub taste_match_min_genres: usize,
    /// Weighted score at which `#Masterpiece` is added
    pub masterpiece_threshold: f32,
    pub masterpiece_tag_score: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            quality: QualityCorrection::default(),
            popularity: PopularityBoost::default(),
            personal: PersonalAffinityConfig::default(),
            tag_threshold: 0.5,
            taste_match_min_genres: 2,
            masterpiece_threshold: 7.5,
            masterpiece_tag_score: 0.2,
        }
    }
}

impl ScoringConfig {
    pub fn with_quality(mut self, quality: QualityCorrection) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_popularity(mut self, popularity: PopularityBoost) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_tag_threshold(mut self, threshold: f32) -> Self {
        self.tag_threshold = threshold;
        self
    }
}

/// Mean of the non-zero cluster values for `mood`; 0 when none are set
pub fn mood_score(movie: &Movie, mood: Mood) -> f32 {
    let values: Vec<f32> = mood
        .clusters()
        .iter()
        .filter_map(|c| movie.emotion_scores.get(*c))
        .filter(|v| *v != 0.0)
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Scores candidate movies for one request
#[derive(Debug, Clone)]
pub struct HybridScorer {
    weights: WeightTable,
    config: ScoringConfig,
    cf: Arc<CfPredictor>,
}

impl HybridScorer {
    pub fn new(cf: Arc<CfPredictor>) -> Self {
        Self {
            weights: WeightTable::default(),
            config: ScoringConfig::default(),
            cf,
        }
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_config(mut self, config: ScoringConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Weights for this profile and request
    pub fn select_weights(
        &self,
        profile: &UserPreferenceProfile,
        signals: &RequestSignals,
    ) -> WeightVector {
        self.weights.select(
            profile.experiment_group,
            signals.mood.is_some(),
            self.cf.is_available(),
        )
    }

    /// Score and sort candidates, highest first.
    ///
    /// The sort is stable: equal scores keep their input order.
    #[instrument(skip_all, fields(candidates = movies.len(), group = %profile.experiment_group))]
    pub fn score(
        &self,
        movies: Vec<Movie>,
        profile: &UserPreferenceProfile,
        signals: &RequestSignals,
    ) -> Vec<ScoredCandidate> {
        let weights = self.select_weights(profile, signals);
        debug!(?weights, "Selected weights");
        self.score_with_weights(movies, profile, signals, weights)
    }

    /// Same as [`score`](Self::score) with explicit weights
    pub fn score_with_weights(
        &self,
        movies: Vec<Movie>,
        profile: &UserPreferenceProfile,
        signals: &RequestSignals,
        weights: WeightVector,
    ) -> Vec<ScoredCandidate> {
        let affinity = PersonalAffinity::new(profile, self.config.personal);

        let mut scored: Vec<ScoredCandidate> = movies
            .into_par_iter()
            .map(|movie| self.score_one(movie, &affinity, signals, &weights))
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored
    }

    fn score_one(
        &self,
        movie: Movie,
        affinity: &PersonalAffinity<'_>,
        signals: &RequestSignals,
        weights: &WeightVector,
    ) -> ScoredCandidate {
        let threshold = self.config.tag_threshold;
        let mut tags = Vec::new();

        let personality_score = match signals.personality {
            Some(p) => {
                let score = movie.trait_scores.score(p);
                if score > threshold {
                    tags.push(Tag::personality(p, score));
                }
                score
            }
            None => 0.0,
        };

        let context_score = match signals.weather {
            Some(w) => {
                let score = movie.context_scores.score(w);
                if score > threshold {
                    tags.push(Tag::weather(w, score));
                }
                score
            }
            None => 0.0,
        };

        let mood = match signals.mood {
            Some(m) => {
                let score = mood_score(&movie, m);
                if score > threshold {
                    tags.push(Tag::mood(m, score));
                }
                score
            }
            None => 0.0,
        };

        let personal = affinity.score(&movie);
        let taste_match = personal.matching_genres >= self.config.taste_match_min_genres;
        if taste_match {
            tags.push(Tag::taste_match(personal.genre_bonus));
        }
        if personal.similar && !taste_match {
            tags.push(Tag::similar_picks(self.config.personal.similar_bonus));
        }

        if movie.weighted_score >= self.config.masterpiece_threshold {
            tags.push(Tag::masterpiece(self.config.masterpiece_tag_score));
        }

        let cf_score = if weights.cf > 0.0 {
            self.cf.predict_normalized(movie.id).unwrap_or(0.0)
        } else {
            0.0
        };

        let mut raw = weights.personality * personality_score
            + weights.context * context_score
            + weights.mood * mood
            + weights.personal * personal.value
            + weights.cf * cf_score;

        if movie.popularity > self.config.popularity.threshold {
            raw += self.config.popularity.bonus;
        }

        let score = (raw * self.config.quality.factor(movie.weighted_score)).clamp(0.0, 1.0);
        // NaN from a corrupt catalog value sorts as the lowest score
        let score = if score.is_nan() { 0.0 } else { score };

        ScoredCandidate::new(movie, score, tags)
    }
}
