//! Shared types for scoring and post-processing.

use data_loader::{Genre, Mood, Movie, MovieId, PersonalityType, Weather};
use serde::{Deserialize, Serialize};

/// What kind of signal a tag explains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    /// Personality-trait affinity
    Trait,
    /// Weather-context affinity
    Context,
    /// Genre taste, similarity neighbors and mood
    Personal,
    /// Catalog quality
    Rating,
    /// Injected off-preference discovery
    Serendipity,
}

/// Explanatory tag attached to a recommendation. Never feeds back into
/// scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: TagKind,
    pub label: String,
    /// Contribution of the signal that produced the tag
    pub score: f32,
}

impl Tag {
    pub fn new(kind: TagKind, label: impl Into<String>, score: f32) -> Self {
        Self {
            kind,
            label: label.into(),
            score,
        }
    }
}

/// A movie with its final hybrid score and tags.
///
/// Produced once per candidate per request; later passes only reorder or
/// drop candidates.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub movie: Movie,
    /// In [0, 1]
    pub score: f32,
    pub tags: Vec<Tag>,
}

impl ScoredCandidate {
    pub fn new(movie: Movie, score: f32, tags: Vec<Tag>) -> Self {
        Self { movie, score, tags }
    }

    pub fn id(&self) -> MovieId {
        self.movie.id
    }

    /// Bucket key for genre-based passes; movies without genres share one
    /// bucket
    pub fn primary_genre(&self) -> Option<Genre> {
        self.movie.primary_genre()
    }

    pub fn has_tag(&self, label: &str) -> bool {
        self.tags.iter().any(|t| t.label == label)
    }
}

/// Per-request context signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSignals {
    pub personality: Option<PersonalityType>,
    pub weather: Option<Weather>,
    pub mood: Option<Mood>,
}

impl RequestSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_personality(mut self, personality: PersonalityType) -> Self {
        self.personality = Some(personality);
        self
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = Some(mood);
        self
    }
}
