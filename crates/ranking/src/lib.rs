//! Hybrid movie ranking.
//!
//! Scores a candidate pool for one request and post-processes the ranked
//! list for diversity:
//!
//! ```text
//! candidates ─► HybridScorer ─► GenreCap ─► ConsecutiveGenreLimit ─► FreshnessQuota
//!                                                                   │
//!                                            inject_serendipity ◄───┘ (optional)
//!                                                   │
//!                                            generate_reason
//! ```
//!
//! Everything here is synchronous and allocation-local; collaborators
//! (catalog store, CF predictor) are passed in.

pub mod diversity;
pub mod hybrid;
pub mod personal;
pub mod reason;
pub mod tags;
pub mod types;
pub mod weights;

pub use diversity::{
    ConsecutiveGenreLimit, DiversityPass, DiversityPipeline, FreshnessQuota, GenreCap,
    SerendipityConfig, cap_by_key, inject_serendipity,
};
pub use hybrid::{HybridScorer, PopularityBoost, QualityCorrection, ScoringConfig, mood_score};
pub use personal::{PersonalAffinity, PersonalAffinityConfig, PersonalScore};
pub use reason::generate_reason;
pub use types::{RequestSignals, ScoredCandidate, Tag, TagKind};
pub use weights::{ArmWeights, ControlWeights, WeightTable, WeightVector};

/// Standard post-scoring chain: genre cap, consecutive limit, freshness
pub fn default_diversity_pipeline() -> DiversityPipeline {
    DiversityPipeline::new()
        .add_pass(GenreCap::default())
        .add_pass(ConsecutiveGenreLimit::default())
        .add_pass(FreshnessQuota::default())
}
