//! Chains diversity passes.

use crate::diversity::traits::DiversityPass;
use crate::types::ScoredCandidate;

/// Runs passes in insertion order with the same target length.
///
/// ## Usage
/// ```ignore
/// let pipeline = DiversityPipeline::new()
///     .add_pass(GenreCap::default())
///     .add_pass(ConsecutiveGenreLimit::default())
///     .add_pass(FreshnessQuota::default());
///
/// let ranked = pipeline.apply(scored, 20);
/// ```
pub struct DiversityPipeline {
    passes: Vec<Box<dyn DiversityPass>>,
}

impl DiversityPipeline {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Add a pass to the pipeline (builder pattern)
    pub fn add_pass(mut self, pass: impl DiversityPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn apply(&self, candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        let mut current = candidates;
        for pass in &self.passes {
            tracing::debug!(
                "Applying diversity pass: {} (input count: {})",
                pass.name(),
                current.len()
            );
            current = pass.apply(current, limit);
            tracing::debug!(
                "Diversity pass applied: {} (output count: {})",
                pass.name(),
                current.len()
            );
        }
        current
    }
}

impl Default for DiversityPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diversity::GenreCap;
    use data_loader::{Genre, Movie};

    fn candidates(n: u32) -> Vec<ScoredCandidate> {
        (1..=n)
            .map(|id| {
                ScoredCandidate::new(Movie::new(id, "m", vec![Genre::Drama]), 1.0 / id as f32, vec![])
            })
            .collect()
    }

    #[test]
    fn test_empty_pipeline_passes_through() {
        let pipeline = DiversityPipeline::new();
        let out = pipeline.apply(candidates(4), 2);
        assert_eq!(out.len(), 4);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_single_pass() {
        let pipeline = DiversityPipeline::new().add_pass(GenreCap::default());
        let out = pipeline.apply(candidates(10), 3);
        let ids: Vec<u32> = out.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(pipeline.len(), 1);
    }
}
