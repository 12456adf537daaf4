//! Core trait for diversity passes.

use crate::types::ScoredCandidate;

/// A reordering step applied after scoring.
///
/// Implementations take ownership of the ranked list and return a new
/// list. They never rescore and never invent candidates; the result holds
/// at most `limit` items unless the pass documents otherwise.
pub trait DiversityPass: Send + Sync {
    /// Returns the name of this pass (for logging)
    fn name(&self) -> &str;

    /// Apply this pass to a ranked list
    ///
    /// # Arguments
    /// * `candidates` - Ranked candidates, best first (takes ownership)
    /// * `limit` - Target output length
    fn apply(&self, candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate>;
}
