//! Building a `DataIndex` from a catalog directory.
//!
//! Expected layout:
//!
//! ```text
//! <dir>/movies.jsonl          required
//! <dir>/users.dat             optional
//! <dir>/ratings.dat           optional
//! <dir>/favorites.dat         optional
//! <dir>/similar_movies.dat    optional
//! ```

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{debug, info};

/// Rating scale bounds accepted by `validate`
pub const MIN_RATING: f32 = 0.5;
pub const MAX_RATING: f32 = 5.0;

/// Treat a missing optional file as empty
fn optional<T>(result: Result<Vec<T>>, name: &str) -> Result<Vec<T>> {
    match result {
        Err(DataLoadError::FileNotFound { .. }) => {
            debug!(file = name, "Optional catalog file not present");
            Ok(Vec::new())
        }
        other => other,
    }
}

impl DataIndex {
    /// Load the catalog and interaction history from a directory.
    ///
    /// All five files are parsed in parallel; the index is validated before
    /// it is returned.
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!(dir = %data_dir.display(), "Loading catalog");

        let movies_path = data_dir.join("movies.jsonl");
        let users_path = data_dir.join("users.dat");
        let ratings_path = data_dir.join("ratings.dat");
        let favorites_path = data_dir.join("favorites.dat");
        let similar_path = data_dir.join("similar_movies.dat");

        let ((movies, users), (ratings, (favorites, similar))) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_movies(&movies_path),
                    || parser::parse_users(&users_path),
                )
            },
            || {
                rayon::join(
                    || parser::parse_ratings(&ratings_path),
                    || {
                        rayon::join(
                            || parser::parse_id_pairs(&favorites_path),
                            || parser::parse_id_pairs(&similar_path),
                        )
                    },
                )
            },
        );

        let movies = movies?;
        let users = optional(users, "users.dat")?;
        let ratings = optional(ratings, "ratings.dat")?;
        let favorites = optional(favorites, "favorites.dat")?;
        let similar = optional(similar, "similar_movies.dat")?;

        info!(
            movies = movies.len(),
            users = users.len(),
            ratings = ratings.len(),
            favorites = favorites.len(),
            similar_edges = similar.len(),
            "Parsed catalog files"
        );

        let mut index = DataIndex::new();
        for movie in movies {
            index.insert_movie(movie);
        }
        for user in users {
            index.insert_user(user);
        }
        for rating in ratings {
            index.insert_rating(rating);
        }
        for (user_id, movie_id) in favorites {
            index.insert_favorite(user_id, movie_id);
        }
        for (movie_id, similar_id) in similar {
            index.insert_similar(movie_id, similar_id);
        }

        index.validate()?;

        info!("Catalog index built and validated");
        Ok(index)
    }

    /// Validate data integrity.
    ///
    /// Ratings and favorites must reference catalog movies and ratings must
    /// lie on the 0.5-5.0 scale. Similarity edges may point outside the
    /// catalog; consumers look them up lazily.
    pub fn validate(&self) -> Result<()> {
        for ratings in self.user_ratings.values() {
            for rating in ratings {
                if !self.movies.contains_key(&rating.movie_id) {
                    return Err(DataLoadError::MissingReference {
                        entity: "Movie".to_string(),
                        id: rating.movie_id,
                    });
                }
                if !(MIN_RATING..=MAX_RATING).contains(&rating.rating) {
                    return Err(DataLoadError::InvalidValue {
                        field: "rating".to_string(),
                        value: rating.rating.to_string(),
                    });
                }
            }
        }

        for favorites in self.favorites.values() {
            if let Some(&missing) = favorites.iter().find(|id| !self.movies.contains_key(id)) {
                return Err(DataLoadError::MissingReference {
                    entity: "Movie".to_string(),
                    id: missing,
                });
            }
        }

        Ok(())
    }
}
