//! Consecutive-genre limiter.

use crate::diversity::traits::DiversityPass;
use crate::types::ScoredCandidate;
use data_loader::Genre;
use std::collections::VecDeque;

/// Reorders so that no `max_consecutive` adjacent items share a primary
/// genre.
///
/// ## Algorithm
/// 1. Look at the last `max_consecutive - 1` accepted genres
/// 2. Take the best remaining candidate that would not extend an
///    all-same window into a full run
/// 3. If every remaining candidate would, relax and take the best one
///
/// No candidate is ever lost to the constraint. Lists no longer than
/// `max_consecutive` are returned as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveGenreLimit {
    pub max_consecutive: usize,
}

impl Default for ConsecutiveGenreLimit {
    fn default() -> Self {
        Self { max_consecutive: 3 }
    }
}

impl ConsecutiveGenreLimit {
    pub fn new(max_consecutive: usize) -> Self {
        Self { max_consecutive }
    }

    fn blocked(window: &VecDeque<Option<Genre>>, width: usize, genre: Option<Genre>) -> bool {
        window.len() >= width && window.iter().all(|g| *g == genre)
    }
}

impl DiversityPass for ConsecutiveGenreLimit {
    fn name(&self) -> &str {
        "ConsecutiveGenreLimit"
    }

    fn apply(&self, candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        if candidates.len() <= self.max_consecutive {
            return candidates;
        }

        let width = self.max_consecutive.saturating_sub(1);
        if width == 0 {
            // A run of one is every list; nothing to enforce
            let mut candidates = candidates;
            candidates.truncate(limit);
            return candidates;
        }

        let mut remaining = candidates;
        let mut result = Vec::with_capacity(limit.min(remaining.len()));
        let mut window: VecDeque<Option<Genre>> = VecDeque::with_capacity(width);

        while result.len() < limit && !remaining.is_empty() {
            let pos = remaining
                .iter()
                .position(|c| !Self::blocked(&window, width, c.primary_genre()))
                .unwrap_or(0);

            let item = remaining.remove(pos);
            if window.len() == width {
                window.pop_front();
            }
            window.push_back(item.primary_genre());
            result.push(item);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Movie;

    fn candidate(id: u32, genre: Genre) -> ScoredCandidate {
        ScoredCandidate::new(Movie::new(id, "m", vec![genre]), 1.0, vec![])
    }

    fn genres(out: &[ScoredCandidate]) -> Vec<Genre> {
        out.iter().filter_map(|c| c.primary_genre()).collect()
    }

    fn longest_run(out: &[ScoredCandidate]) -> usize {
        let mut best = 0;
        let mut run = 0;
        let mut prev = None;
        for c in out {
            let g = c.primary_genre();
            run = if Some(g) == prev { run + 1 } else { 1 };
            prev = Some(g);
            best = best.max(run);
        }
        best
    }

    #[test]
    fn test_breaks_runs() {
        let input = vec![
            candidate(1, Genre::Action),
            candidate(2, Genre::Action),
            candidate(3, Genre::Action),
            candidate(4, Genre::Action),
            candidate(5, Genre::Drama),
            candidate(6, Genre::Comedy),
        ];
        let out = ConsecutiveGenreLimit::default().apply(input, 6);

        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 5, 3, 4, 6]);
        assert!(longest_run(&out) < 3);
    }

    #[test]
    fn test_all_one_genre_relaxes_without_loss() {
        let input: Vec<ScoredCandidate> = (1..=8).map(|id| candidate(id, Genre::Horror)).collect();
        let out = ConsecutiveGenreLimit::default().apply(input, 8);

        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        assert_eq!(genres(&out), vec![Genre::Horror; 8]);
    }

    #[test]
    fn test_short_list_is_untouched() {
        let input = vec![
            candidate(1, Genre::Action),
            candidate(2, Genre::Action),
            candidate(3, Genre::Action),
        ];
        let out = ConsecutiveGenreLimit::default().apply(input, 1);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_stops_at_limit() {
        let input: Vec<ScoredCandidate> = (1..=10)
            .map(|id| candidate(id, if id % 2 == 0 { Genre::Drama } else { Genre::Crime }))
            .collect();
        let out = ConsecutiveGenreLimit::default().apply(input, 4);
        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_satisfying_list_is_a_no_op() {
        let input: Vec<ScoredCandidate> = (1..=6)
            .map(|id| candidate(id, if id % 3 == 0 { Genre::Drama } else { Genre::Crime }))
            .collect();
        let out = ConsecutiveGenreLimit::default().apply(input, 6);
        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, (1..=6).collect::<Vec<_>>());
    }
}
