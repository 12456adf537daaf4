//! Movie Store - typed query interface over the catalog
//!
//! Scoring and retrieval never build storage queries themselves. They
//! describe what they need with a [`MovieFilter`] plus a [`SortOrder`] and
//! [`Page`], and hand it to whatever [`MovieStore`] the process was built
//! with. [`InMemoryStore`] answers those queries from a shared `DataIndex`.

use async_trait::async_trait;
use data_loader::{DataIndex, Genre, Movie, MovieId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached
    #[error("Movie store unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with something we could not use
    #[error("Movie store query failed: {0}")]
    Query(String),
}

/// Filter criteria for a catalog query. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Keep movies whose weighted score is at least this
    pub min_quality: Option<f32>,
    /// Certification allow-list; uncertified movies always pass
    pub allowed_certifications: Option<Vec<String>>,
    /// Keep movies sharing at least one of these genres
    pub genres_any: Vec<Genre>,
    /// Drop movies sharing any of these genres
    pub exclude_genres: Vec<Genre>,
    pub exclude_ids: HashSet<MovieId>,
    /// Case-insensitive substring of title or original title
    pub title_contains: Option<String>,
}

impl MovieFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_quality(mut self, min_quality: f32) -> Self {
        self.min_quality = Some(min_quality);
        self
    }

    pub fn with_certifications<I, S>(mut self, certifications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_certifications = Some(certifications.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_genres_any(mut self, genres: impl IntoIterator<Item = Genre>) -> Self {
        self.genres_any.extend(genres);
        self
    }

    pub fn with_excluded_genres(mut self, genres: impl IntoIterator<Item = Genre>) -> Self {
        self.exclude_genres.extend(genres);
        self
    }

    pub fn with_excluded_ids(mut self, ids: impl IntoIterator<Item = MovieId>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn with_title_contains(mut self, needle: impl Into<String>) -> Self {
        self.title_contains = Some(needle.into().to_lowercase());
        self
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        if self.exclude_ids.contains(&movie.id) {
            return false;
        }
        if let Some(min) = self.min_quality
            && movie.weighted_score < min
        {
            return false;
        }
        if let (Some(allowed), Some(cert)) = (&self.allowed_certifications, &movie.certification)
            && !allowed.iter().any(|a| a == cert)
        {
            return false;
        }
        if !self.genres_any.is_empty() && !movie.has_any_genre(&self.genres_any) {
            return false;
        }
        if movie.has_any_genre(&self.exclude_genres) {
            return false;
        }
        if let Some(needle) = &self.title_contains {
            let in_title = movie.title.to_lowercase().contains(needle.as_str());
            let in_original = movie
                .original_title
                .as_ref()
                .is_some_and(|t| t.to_lowercase().contains(needle.as_str()));
            if !in_title && !in_original {
                return false;
            }
        }
        true
    }
}

/// Result ordering. Both orders break remaining ties by ascending id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Popularity descending, then weighted score descending
    #[default]
    Popularity,
    /// Weighted score descending, then popularity descending
    Quality,
}

impl SortOrder {
    pub fn compare(self, a: &Movie, b: &Movie) -> Ordering {
        let by_popularity = || b.popularity.partial_cmp(&a.popularity).unwrap_or(Ordering::Equal);
        let by_quality = || {
            b.weighted_score
                .partial_cmp(&a.weighted_score)
                .unwrap_or(Ordering::Equal)
        };
        let primary = match self {
            SortOrder::Popularity => by_popularity().then_with(by_quality),
            SortOrder::Quality => by_quality().then_with(by_popularity),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Offset/limit window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

/// Opaque movie store collaborator
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Movies matching `filter`, sorted and windowed
    async fn query(
        &self,
        filter: &MovieFilter,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Movie>, StoreError>;

    /// Movies for the given ids, in input order; unknown ids are skipped
    async fn fetch_by_ids(&self, ids: &[MovieId]) -> Result<Vec<Movie>, StoreError>;
}

/// Store backed by the in-process catalog
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    data_index: Arc<DataIndex>,
}

impl InMemoryStore {
    pub fn new(data_index: Arc<DataIndex>) -> Self {
        Self { data_index }
    }

    pub fn data_index(&self) -> &Arc<DataIndex> {
        &self.data_index
    }
}

#[async_trait]
impl MovieStore for InMemoryStore {
    #[instrument(skip(self, filter), fields(offset = page.offset, limit = page.limit))]
    async fn query(
        &self,
        filter: &MovieFilter,
        order: SortOrder,
        page: Page,
    ) -> Result<Vec<Movie>, StoreError> {
        let all: Vec<&Movie> = self.data_index.movies().collect();
        let mut matched: Vec<&Movie> = all.into_par_iter().filter(|m| filter.matches(m)).collect();
        matched.par_sort_unstable_by(|a, b| order.compare(a, b));

        let movies: Vec<Movie> = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();

        debug!(returned = movies.len(), "Store query answered");
        Ok(movies)
    }

    async fn fetch_by_ids(&self, ids: &[MovieId]) -> Result<Vec<Movie>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.data_index.get_movie(*id))
            .cloned()
            .collect())
    }
}
