//! Diversity post-processing.
//!
//! Passes reorder or drop scored candidates; they never rescore them. The
//! order-preserving passes (genre cap, consecutive-genre limit, freshness)
//! implement [`DiversityPass`] and chain through a [`DiversityPipeline`].
//! Serendipity needs an external pool and a random source, so it is a
//! free function.

pub mod consecutive;
pub mod freshness;
pub mod genre_cap;
pub mod pipeline;
pub mod serendipity;
pub mod traits;

pub use consecutive::ConsecutiveGenreLimit;
pub use freshness::FreshnessQuota;
pub use genre_cap::{GenreCap, cap_by_key};
pub use pipeline::DiversityPipeline;
pub use serendipity::{SerendipityConfig, inject_serendipity};
pub use traits::DiversityPass;

/// `floor(limit · ratio)`, never below `min`
pub(crate) fn quota(limit: usize, ratio: f64, min: usize) -> usize {
    ((limit as f64 * ratio).floor() as usize).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_floors() {
        assert_eq!(quota(20, 0.35, 2), 7);
        assert_eq!(quota(10, 0.35, 2), 3);
        assert_eq!(quota(6, 0.35, 2), 2);
        assert_eq!(quota(4, 0.1, 1), 1);
    }
}
