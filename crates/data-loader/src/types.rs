//! Core domain types for the movie catalog.
//!
//! Movies, users and their interaction history, plus `DataIndex`, the
//! in-memory store everything else reads from.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::affinity::{ContextAffinity, EmotionAffinity, PersonalityType, TraitAffinity};
use crate::error::DataLoadError;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie (catalog id, not a row index)
pub type MovieId = u32;

// =============================================================================
// Genres
// =============================================================================

/// Catalog genres.
///
/// Declaration order doubles as the tie-break order wherever genres are
/// ranked by count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    #[serde(rename = "Science Fiction", alias = "Sci-Fi")]
    ScienceFiction,
    #[serde(rename = "TV Movie")]
    TvMovie,
    Thriller,
    War,
    Western,
}

impl Genre {
    pub const ALL: [Genre; 19] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::TvMovie,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Family => "Family",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Music => "Music",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::ScienceFiction => "Science Fiction",
            Genre::TvMovie => "TV Movie",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }
}

impl FromStr for Genre {
    type Err = DataLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("sci-fi") {
            return Ok(Genre::ScienceFiction);
        }
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DataLoadError::InvalidValue {
                field: "genre".to_string(),
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movies
// =============================================================================

/// A catalog movie. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    /// Ordered; the first entry is the primary genre
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub popularity: f32,
    /// Bayesian-weighted vote score on a 0-10 scale
    #[serde(default)]
    pub weighted_score: f32,
    #[serde(default)]
    pub vote_average: f32,
    /// Local age certification ("12", "15", "PG-13", ...)
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub trait_scores: TraitAffinity,
    #[serde(default)]
    pub context_scores: ContextAffinity,
    #[serde(default)]
    pub emotion_scores: EmotionAffinity,
}

impl Movie {
    /// Minimal movie with empty affinity tables, mostly for fixtures
    pub fn new(id: MovieId, title: impl Into<String>, genres: Vec<Genre>) -> Self {
        Self {
            id,
            title: title.into(),
            original_title: None,
            genres,
            release_date: None,
            popularity: 0.0,
            weighted_score: 0.0,
            vote_average: 0.0,
            certification: None,
            trait_scores: TraitAffinity::new(),
            context_scores: ContextAffinity::new(),
            emotion_scores: EmotionAffinity::new(),
        }
    }

    pub fn primary_genre(&self) -> Option<Genre> {
        self.genres.first().copied()
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    pub fn has_any_genre(&self, genres: &[Genre]) -> bool {
        self.genres.iter().any(|g| genres.contains(g))
    }
}

// =============================================================================
// Users
// =============================================================================

/// A/B experiment cohort. Unknown labels behave as `Control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentGroup {
    #[default]
    Control,
    TestA,
    TestB,
}

impl ExperimentGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentGroup::Control => "control",
            ExperimentGroup::TestA => "test_a",
            ExperimentGroup::TestB => "test_b",
        }
    }
}

impl FromStr for ExperimentGroup {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "test_a" => ExperimentGroup::TestA,
            "test_b" => ExperimentGroup::TestB,
            _ => ExperimentGroup::Control,
        })
    }
}

impl fmt::Display for ExperimentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub experiment_group: ExperimentGroup,
    pub personality: Option<PersonalityType>,
}

/// A single rating from a user for a movie
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// 0.5 to 5.0 in half-star steps
    pub rating: f32,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
}

// =============================================================================
// DataIndex
// =============================================================================

/// In-memory catalog plus per-user history.
///
/// Owns all data; getters hand out references and empty slices for
/// unknown ids.
#[derive(Debug)]
pub struct DataIndex {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) movies: HashMap<MovieId, Movie>,

    /// All ratings made by each user
    pub(crate) user_ratings: HashMap<UserId, Vec<Rating>>,
    /// Favorited movie ids per user, in insertion order
    pub(crate) favorites: HashMap<UserId, Vec<MovieId>>,
    /// Precomputed similarity graph (movie -> similar movies)
    pub(crate) similar: HashMap<MovieId, Vec<MovieId>>,

    /// Movies grouped by genre (one movie can appear in multiple genre lists)
    pub(crate) genre_index: HashMap<Genre, Vec<MovieId>>,
}

impl DataIndex {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            movies: HashMap::new(),
            user_ratings: HashMap::new(),
            favorites: HashMap::new(),
            similar: HashMap::new(),
            genre_index: HashMap::new(),
        }
    }

    pub fn get_user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Iterate over every movie in the catalog (unordered)
    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.movies.values()
    }

    /// All user ids, ascending
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get all ratings made by a user; empty if the user has none
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_favorites(&self, user_id: UserId) -> &[MovieId] {
        self.favorites
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Neighbors of a movie in the similarity graph
    pub fn get_similar(&self, movie_id: MovieId) -> &[MovieId] {
        self.similar
            .get(&movie_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_movies_by_genre(&self, genre: Genre) -> &[MovieId] {
        self.genre_index
            .get(&genre)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert a movie and index it by genre
    pub fn insert_movie(&mut self, movie: Movie) {
        if let Some(previous) = self.movies.remove(&movie.id) {
            for genre in &previous.genres {
                if let Some(ids) = self.genre_index.get_mut(genre) {
                    ids.retain(|&id| id != previous.id);
                }
            }
        }
        for &genre in &movie.genres {
            self.genre_index.entry(genre).or_default().push(movie.id);
        }
        self.movies.insert(movie.id, movie);
    }

    pub fn insert_rating(&mut self, rating: Rating) {
        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);
    }

    /// Record a favorite; duplicates are ignored
    pub fn insert_favorite(&mut self, user_id: UserId, movie_id: MovieId) {
        let favorites = self.favorites.entry(user_id).or_default();
        if !favorites.contains(&movie_id) {
            favorites.push(movie_id);
        }
    }

    pub fn insert_similar(&mut self, movie_id: MovieId, similar_id: MovieId) {
        self.similar.entry(movie_id).or_default().push(similar_id);
    }

    /// (users, movies, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.user_ratings.values().map(|v| v.len()).sum();
        (self.users.len(), self.movies.len(), total_ratings)
    }
}

impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_names_round_trip_through_from_str() {
        for genre in Genre::ALL {
            assert_eq!(genre.as_str().parse::<Genre>().unwrap(), genre);
        }
        assert_eq!("sci-fi".parse::<Genre>().unwrap(), Genre::ScienceFiction);
        assert!("Children's".parse::<Genre>().is_err());
    }

    #[test]
    fn test_genre_serde_uses_display_names() {
        let json = serde_json::to_string(&Genre::ScienceFiction).unwrap();
        assert_eq!(json, "\"Science Fiction\"");
        let genre: Genre = serde_json::from_str("\"TV Movie\"").unwrap();
        assert_eq!(genre, Genre::TvMovie);
    }

    #[test]
    fn test_unknown_experiment_group_is_control() {
        assert_eq!("test_b".parse::<ExperimentGroup>().unwrap(), ExperimentGroup::TestB);
        assert_eq!("holdout".parse::<ExperimentGroup>().unwrap(), ExperimentGroup::Control);
        assert_eq!("".parse::<ExperimentGroup>().unwrap(), ExperimentGroup::Control);
    }

    #[test]
    fn test_primary_genre_and_year() {
        let mut movie = Movie::new(7, "Parasite", vec![Genre::Comedy, Genre::Thriller]);
        movie.release_date = NaiveDate::from_ymd_opt(2019, 5, 30);

        assert_eq!(movie.primary_genre(), Some(Genre::Comedy));
        assert_eq!(movie.release_year(), Some(2019));
        assert!(movie.has_any_genre(&[Genre::Thriller]));
        assert_eq!(Movie::new(8, "Untitled", vec![]).primary_genre(), None);
    }

    #[test]
    fn test_user_serde_round_trip() {
        let user = User {
            id: 4,
            experiment_group: ExperimentGroup::TestB,
            personality: Some(PersonalityType::Istp),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["personality"], "ISTP");
        assert_eq!(json["experiment_group"], "test_b");

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back.personality, Some(PersonalityType::Istp));
        assert_eq!(back.experiment_group, ExperimentGroup::TestB);
    }

    #[test]
    fn test_reinserting_movie_reindexes_genres() {
        let mut index = DataIndex::new();
        index.insert_movie(Movie::new(1, "A", vec![Genre::Drama]));
        index.insert_movie(Movie::new(1, "A", vec![Genre::Horror]));

        assert!(index.get_movies_by_genre(Genre::Drama).is_empty());
        assert_eq!(index.get_movies_by_genre(Genre::Horror), &[1]);
    }
}
