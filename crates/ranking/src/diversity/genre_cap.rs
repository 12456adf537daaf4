//! Per-genre share cap with deferred backfill.

use crate::diversity::quota;
use crate::diversity::traits::DiversityPass;
use crate::types::ScoredCandidate;
use std::collections::HashMap;
use std::hash::Hash;

/// Keep at most `max_per_key` items per key among the first `limit`.
///
/// Over-cap items are deferred, not dropped: if the capped scan comes up
/// short of `limit`, deferred items are appended in their original order.
/// The cap is therefore exceeded only by the exact shortfall.
pub fn cap_by_key<T, K, F>(items: Vec<T>, limit: usize, max_per_key: usize, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    let mut result = Vec::with_capacity(limit.min(items.len()));
    let mut deferred = Vec::new();

    for item in items {
        if result.len() >= limit {
            break;
        }
        let count = counts.entry(key(&item)).or_insert(0);
        if *count >= max_per_key {
            deferred.push(item);
            continue;
        }
        *count += 1;
        result.push(item);
    }

    let shortfall = limit.saturating_sub(result.len());
    result.extend(deferred.into_iter().take(shortfall));
    result
}

/// Caps any single primary genre at `max(floor(limit · max_ratio), min_cap)`.
///
/// Lists with `limit <= min_limit` are only truncated. Movies without a
/// genre share one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenreCap {
    pub max_ratio: f64,
    pub min_cap: usize,
    pub min_limit: usize,
}

impl Default for GenreCap {
    fn default() -> Self {
        Self {
            max_ratio: 0.35,
            min_cap: 2,
            min_limit: 5,
        }
    }
}

impl GenreCap {
    pub fn with_max_ratio(mut self, ratio: f64) -> Self {
        self.max_ratio = ratio;
        self
    }

    /// Per-genre cap for a target length
    pub fn cap_for(&self, limit: usize) -> usize {
        quota(limit, self.max_ratio, self.min_cap)
    }
}

impl DiversityPass for GenreCap {
    fn name(&self) -> &str {
        "GenreCap"
    }

    fn apply(&self, mut candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        if candidates.is_empty() || limit <= self.min_limit {
            candidates.truncate(limit);
            return candidates;
        }
        cap_by_key(candidates, limit, self.cap_for(limit), |c| c.primary_genre())
    }
}
