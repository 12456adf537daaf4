//! Composite relevance for reranking vector-search hits.
//!
//! ```text
//! relevance = w_sim·similarity + w_pop·popularity_score + w_qual·quality_score
//! popularity_score = ln(1 + popularity) / ln(1 + saturation)   clamped to [0, 1]
//! quality_score    = weighted_score / quality_max               clamped to [0, 1]
//! ```

use data_loader::Movie;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub similarity: f32,
    pub popularity: f32,
    pub quality: f32,
    /// Popularity at which the popularity score reaches 1
    pub popularity_saturation: f32,
    pub quality_max: f32,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            similarity: 0.50,
            popularity: 0.30,
            quality: 0.20,
            popularity_saturation: 1000.0,
            quality_max: 10.0,
        }
    }
}

impl RelevanceWeights {
    pub fn popularity_score(&self, popularity: f32) -> f32 {
        let denom = self.popularity_saturation.ln_1p();
        if denom <= 0.0 {
            return 0.0;
        }
        (popularity.max(0.0).ln_1p() / denom).clamp(0.0, 1.0)
    }

    pub fn quality_score(&self, weighted_score: f32) -> f32 {
        if self.quality_max <= 0.0 {
            return 0.0;
        }
        (weighted_score / self.quality_max).clamp(0.0, 1.0)
    }

    pub fn score(&self, similarity: f32, movie: &Movie) -> f32 {
        self.similarity * similarity
            + self.popularity * self.popularity_score(movie.popularity)
            + self.quality * self.quality_score(movie.weighted_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Genre;

    #[test]
    fn test_component_scores_saturate() {
        let w = RelevanceWeights::default();
        assert_eq!(w.popularity_score(0.0), 0.0);
        assert!((w.popularity_score(1000.0) - 1.0).abs() < 1e-6);
        assert_eq!(w.popularity_score(50_000.0), 1.0);
        assert!(w.popularity_score(30.0) > 0.4 && w.popularity_score(30.0) < 0.6);

        assert!((w.quality_score(7.5) - 0.75).abs() < 1e-6);
        assert_eq!(w.quality_score(12.0), 1.0);
    }

    #[test]
    fn test_composite() {
        let w = RelevanceWeights::default();
        let mut m = Movie::new(1, "x", vec![Genre::Drama]);
        m.popularity = 1000.0;
        m.weighted_score = 5.0;

        // 0.5·0.8 + 0.3·1.0 + 0.2·0.5
        assert!((w.score(0.8, &m) - 0.8).abs() < 1e-5);
    }
}
