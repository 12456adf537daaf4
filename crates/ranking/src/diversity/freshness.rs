//! Recent/classic quota.

use crate::diversity::quota;
use crate::diversity::traits::DiversityPass;
use crate::types::ScoredCandidate;
use chrono::{Datelike, Utc};
use std::collections::HashSet;

/// Guarantees a minimum number of recent and classic titles.
///
/// ```text
/// recent  : release year >= current_year - recent_years
/// classic : release year <  current_year - classic_years
/// middle  : everything else, including undated titles
/// ```
///
/// Output starts with the best `max(floor(limit · recent_ratio), 1)` recent
/// titles, then the best `max(floor(limit · classic_ratio), 1)` classics,
/// then the rest in original order. Lists with `limit <= 3` are only
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreshnessQuota {
    pub recent_years: i32,
    pub classic_years: i32,
    pub recent_ratio: f64,
    pub classic_ratio: f64,
    pub current_year: i32,
}

impl Default for FreshnessQuota {
    fn default() -> Self {
        Self {
            recent_years: 3,
            classic_years: 10,
            recent_ratio: 0.20,
            classic_ratio: 0.10,
            current_year: Utc::now().year(),
        }
    }
}

impl FreshnessQuota {
    const MIN_LIMIT: usize = 3;

    /// Pin the reference year (tests, replays)
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    fn is_recent(&self, year: i32) -> bool {
        year >= self.current_year - self.recent_years
    }

    fn is_classic(&self, year: i32) -> bool {
        year < self.current_year - self.classic_years
    }
}

impl DiversityPass for FreshnessQuota {
    fn name(&self) -> &str {
        "FreshnessQuota"
    }

    fn apply(&self, mut candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        if candidates.is_empty() || limit <= Self::MIN_LIMIT {
            candidates.truncate(limit);
            return candidates;
        }

        let min_recent = quota(limit, self.recent_ratio, 1);
        let min_classic = quota(limit, self.classic_ratio, 1);

        let recent: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.movie.release_year().is_some_and(|y| self.is_recent(y)))
            .map(|(i, _)| i)
            .take(min_recent)
            .collect();
        let classic: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.movie.release_year().is_some_and(|y| self.is_classic(y)))
            .map(|(i, _)| i)
            .take(min_classic)
            .collect();

        let mut order: Vec<usize> = Vec::with_capacity(limit);
        let mut used: HashSet<usize> = HashSet::new();
        for i in recent.into_iter().chain(classic) {
            used.insert(i);
            order.push(i);
        }
        for i in 0..candidates.len() {
            if order.len() >= limit {
                break;
            }
            if used.insert(i) {
                order.push(i);
            }
        }
        order.truncate(limit);

        let mut slots: Vec<Option<ScoredCandidate>> = candidates.into_iter().map(Some).collect();
        order.into_iter().filter_map(|i| slots[i].take()).collect()
    }
}
