//! # Data Loader Crate
//!
//! Domain types and loaders for the movie catalog.
//!
//! ## Main Components
//!
//! - **types**: Movie, Genre, User, Rating, ExperimentGroup and `DataIndex`
//! - **affinity**: closed key sets (personality, weather, emotion cluster,
//!   mood) and the fixed-size affinity tables every movie carries
//! - **parser**: catalog file parsers
//! - **index**: build and validate a `DataIndex` from a directory
//! - **snapshot**: precomputed CF bias model and embedding matrix
//! - **error**: error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data/catalog"))?;
//! let movie = index.get_movie(603).unwrap();
//! println!("{} ({:?})", movie.title, movie.primary_genre());
//! ```

pub mod affinity;
pub mod error;
pub mod index;
pub mod parser;
pub mod snapshot;
pub mod types;

pub use affinity::{
    AffinityKey, AffinityMap, ContextAffinity, EmotionAffinity, EmotionCluster, Mood,
    PersonalityType, Temperament, TraitAffinity, Weather,
};
pub use error::{DataLoadError, Result};
pub use snapshot::{CfSnapshot, EmbeddingSnapshot, NpyMatrix};
pub use types::{
    // Type aliases
    MovieId,
    UserId,
    // Core types
    DataIndex,
    ExperimentGroup,
    Genre,
    Movie,
    Rating,
    User,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_index_creation() {
        let index = DataIndex::new();
        let (users, movies, ratings) = index.counts();

        assert_eq!(users, 0);
        assert_eq!(movies, 0);
        assert_eq!(ratings, 0);
    }

    #[test]
    fn test_insert_user() {
        let mut index = DataIndex::new();

        index.insert_user(User {
            id: 1,
            experiment_group: ExperimentGroup::TestB,
            personality: Some(PersonalityType::Enfp),
        });

        let retrieved = index.get_user(1).unwrap();
        assert_eq!(retrieved.experiment_group, ExperimentGroup::TestB);
        assert_eq!(retrieved.personality, Some(PersonalityType::Enfp));
    }

    #[test]
    fn test_insert_movie() {
        let mut index = DataIndex::new();

        let mut movie = Movie::new(603, "The Matrix", vec![Genre::Action, Genre::ScienceFiction]);
        movie.trait_scores.set(PersonalityType::Intj, 0.92);
        index.insert_movie(movie);

        let retrieved = index.get_movie(603).unwrap();
        assert_eq!(retrieved.genres.len(), 2);
        assert_eq!(retrieved.trait_scores.get(PersonalityType::Intj), Some(0.92));
        assert_eq!(index.get_movies_by_genre(Genre::ScienceFiction), &[603]);
    }

    #[test]
    fn test_insert_rating() {
        let mut index = DataIndex::new();

        index.insert_rating(Rating {
            user_id: 1,
            movie_id: 603,
            rating: 5.0,
            timestamp: 978300760,
        });

        let user_ratings = index.get_user_ratings(1);
        assert_eq!(user_ratings.len(), 1);
        assert_eq!(user_ratings[0].rating, 5.0);
    }

    #[test]
    fn test_empty_queries() {
        let index = DataIndex::new();

        assert!(index.get_user(999).is_none());
        assert!(index.get_movie(999).is_none());
        assert!(index.get_user_ratings(999).is_empty());
        assert!(index.get_favorites(999).is_empty());
        assert!(index.get_similar(999).is_empty());
        assert!(index.get_movies_by_genre(Genre::Action).is_empty());
    }
}
