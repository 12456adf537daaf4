//! Serendipity injection.
//!
//! Replaces the tail of the list with a few high-quality movies from
//! outside the user's usual genres, spliced in at ~70% depth so the head of
//! the list keeps its relevance.

use crate::diversity::quota;
use crate::types::{ScoredCandidate, Tag};
use data_loader::{Genre, Movie, MovieId};
use rand::Rng;
use rand::seq::index;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerendipityConfig {
    /// Share of the list given to discoveries (at least one slot)
    pub ratio: f64,
    /// Quality floor for the discovery pool
    pub min_quality: f32,
    /// Pool is fetched at `count · pool_multiplier` to leave room for dedupe
    pub pool_multiplier: usize,
    /// Relative position of the first injected item within the main list
    pub insert_fraction: f64,
}

impl Default for SerendipityConfig {
    fn default() -> Self {
        Self {
            ratio: 0.10,
            min_quality: 7.0,
            pool_multiplier: 5,
            insert_fraction: 0.7,
        }
    }
}

impl SerendipityConfig {
    /// Number of discovery slots for a target length
    pub fn count(&self, limit: usize) -> usize {
        quota(limit, self.ratio, 1)
    }

    /// How many pool movies to request from the store
    pub fn pool_size(&self, limit: usize) -> usize {
        self.count(limit) * self.pool_multiplier
    }
}

/// Splice discoveries from `pool` into the ranked list.
///
/// Keeps the first `limit - count` candidates, samples up to `count`
/// eligible pool movies with `rng`, and inserts them starting at
/// `floor((limit - count) · insert_fraction)`. Injected items score 0 and
/// carry a single `#Discovery` tag. Pool movies below the quality floor,
/// sharing a top genre, or already in the main list are ignored.
///
/// Returns the list unchanged when it is empty or `top_genres` is empty,
/// and the list truncated to `limit` when no pool movie is eligible.
pub fn inject_serendipity<R: Rng + ?Sized>(
    candidates: Vec<ScoredCandidate>,
    limit: usize,
    pool: Vec<Movie>,
    top_genres: &[Genre],
    config: &SerendipityConfig,
    rng: &mut R,
) -> Vec<ScoredCandidate> {
    if candidates.is_empty() || top_genres.is_empty() {
        return candidates;
    }

    let count = config.count(limit);
    let main_count = limit.saturating_sub(count);

    let mut result = candidates;
    let mut tail = result.split_off(main_count.min(result.len()));
    let used: HashSet<MovieId> = result.iter().map(|c| c.id()).collect();

    let mut seen = HashSet::new();
    let mut eligible: Vec<Movie> = pool
        .into_iter()
        .filter(|m| m.weighted_score >= config.min_quality)
        .filter(|m| !m.has_any_genre(top_genres))
        .filter(|m| !used.contains(&m.id) && seen.insert(m.id))
        .collect();

    let picks = count.min(eligible.len());
    if picks == 0 {
        result.append(&mut tail);
        result.truncate(limit);
        return result;
    }

    let chosen: Vec<usize> = index::sample(rng, eligible.len(), picks).into_vec();
    let mut slots: Vec<Option<Movie>> = eligible.drain(..).map(Some).collect();

    let insert_at = (main_count as f64 * config.insert_fraction).floor() as usize;
    for (offset, i) in chosen.into_iter().enumerate() {
        if let Some(movie) = slots[i].take() {
            debug!(movie_id = movie.id, "Injecting discovery");
            let pos = (insert_at + offset).min(result.len());
            result.insert(pos, ScoredCandidate::new(movie, 0.0, vec![Tag::discovery()]));
        }
    }

    result.truncate(limit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::DISCOVERY;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn candidate(id: u32) -> ScoredCandidate {
        ScoredCandidate::new(Movie::new(id, "m", vec![Genre::Drama]), 1.0, vec![])
    }

    fn pool_movie(id: u32, genre: Genre, quality: f32) -> Movie {
        let mut m = Movie::new(id, "p", vec![genre]);
        m.weighted_score = quality;
        m
    }

    #[test]
    fn test_counts() {
        let config = SerendipityConfig::default();
        assert_eq!(config.count(20), 2);
        assert_eq!(config.count(5), 1);
        assert_eq!(config.pool_size(20), 10);
    }

    #[test]
    fn test_injects_at_seventy_percent() {
        let input: Vec<ScoredCandidate> = (1..=20).map(candidate).collect();
        let pool = vec![
            pool_movie(100, Genre::Western, 7.5),
            pool_movie(101, Genre::Music, 8.0),
        ];
        let mut rng = StdRng::seed_from_u64(42);

        let out = inject_serendipity(
            input,
            20,
            pool,
            &[Genre::Drama],
            &SerendipityConfig::default(),
            &mut rng,
        );

        assert_eq!(out.len(), 20);
        // main list is 18 long; injection starts at floor(18 · 0.7) = 12
        assert!(out[12].has_tag(DISCOVERY));
        assert!(out[13].has_tag(DISCOVERY));
        assert_eq!(out[12].score, 0.0);
        assert_eq!(out[11].id(), 12);
        assert_eq!(out[14].id(), 13);
        assert_eq!(out[19].id(), 18);
    }

    #[test]
    fn test_same_seed_same_output() {
        let pool: Vec<Movie> = (100..120).map(|id| pool_movie(id, Genre::Western, 7.5)).collect();
        let run = |seed| {
            let input: Vec<ScoredCandidate> = (1..=30).map(candidate).collect();
            let mut rng = StdRng::seed_from_u64(seed);
            inject_serendipity(
                input,
                30,
                pool.clone(),
                &[Genre::Drama],
                &SerendipityConfig::default(),
                &mut rng,
            )
            .iter()
            .map(|c| c.id())
            .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_ineligible_pool_is_ignored() {
        let input: Vec<ScoredCandidate> = (1..=10).map(candidate).collect();
        let pool = vec![
            pool_movie(100, Genre::Drama, 9.0),
            pool_movie(101, Genre::Western, 6.5),
            pool_movie(3, Genre::Western, 9.0),
        ];
        let mut rng = StdRng::seed_from_u64(1);

        let out = inject_serendipity(
            input,
            8,
            pool,
            &[Genre::Drama],
            &SerendipityConfig::default(),
            &mut rng,
        );
        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_no_top_genres_is_a_no_op() {
        let input: Vec<ScoredCandidate> = (1..=10).map(candidate).collect();
        let pool = vec![pool_movie(100, Genre::Western, 9.0)];
        let mut rng = StdRng::seed_from_u64(1);

        let out = inject_serendipity(input, 5, pool, &[], &SerendipityConfig::default(), &mut rng);
        assert_eq!(out.len(), 10);
        assert!(!out.iter().any(|c| c.has_tag(DISCOVERY)));
    }

    #[test]
    fn test_pool_duplicates_are_sampled_once() {
        let input: Vec<ScoredCandidate> = (1..=20).map(candidate).collect();
        let pool = vec![
            pool_movie(100, Genre::Western, 8.0),
            pool_movie(100, Genre::Western, 8.0),
        ];
        let mut rng = StdRng::seed_from_u64(3);

        let out = inject_serendipity(
            input,
            20,
            pool,
            &[Genre::Drama],
            &SerendipityConfig::default(),
            &mut rng,
        );
        assert_eq!(out.iter().filter(|c| c.id() == 100).count(), 1);
        assert_eq!(out.len(), 19);
    }
}
