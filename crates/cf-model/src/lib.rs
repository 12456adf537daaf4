//! Collaborative-filtering quality predictor.
//!
//! Consumes a precomputed global-mean + item-bias model and turns it into a
//! content-agnostic quality estimate per movie. The model is loaded at most
//! once per predictor:
//!
//! ```text
//! unloaded --(first use / warm_up)--> loaded        (terminal)
//!                                 \-> unavailable   (terminal)
//! ```
//!
//! A failed or missing snapshot is not an error for callers: the predictor
//! simply answers "no estimate" and the CF weight folds to zero upstream.

use data_loader::{CfSnapshot, DataLoadError, MovieId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

/// Lower bound of the rating scale the model was fitted on
pub const RATING_MIN: f32 = 0.5;
/// Upper bound of the rating scale the model was fitted on
pub const RATING_MAX: f32 = 5.0;

#[derive(Error, Debug)]
pub enum CfModelError {
    #[error("CF snapshot could not be loaded: {0}")]
    Snapshot(#[from] DataLoadError),

    #[error("No CF snapshot configured")]
    NotConfigured,
}

/// Rescale a raw rating-range estimate to [0, 1]
pub fn normalize_cf_score(value: f32) -> f32 {
    ((value - RATING_MIN) / (RATING_MAX - RATING_MIN)).clamp(0.0, 1.0)
}

/// Loaded bias model
#[derive(Debug, Clone)]
pub struct CfModel {
    global_mean: f32,
    item_bias: Vec<f32>,
    item_map: HashMap<MovieId, usize>,
}

impl CfModel {
    pub fn from_snapshot(snapshot: CfSnapshot) -> Self {
        Self {
            global_mean: snapshot.global_mean,
            item_bias: snapshot.item_bias,
            item_map: snapshot.item_map,
        }
    }

    /// `clip(global_mean + item_bias[movie], RATING_MIN, RATING_MAX)`;
    /// `None` for unmapped movies
    pub fn predict(&self, movie_id: MovieId) -> Option<f32> {
        let idx = *self.item_map.get(&movie_id)?;
        let bias = self.item_bias.get(idx)?;
        Some((self.global_mean + bias).clamp(RATING_MIN, RATING_MAX))
    }

    pub fn len(&self) -> usize {
        self.item_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_map.is_empty()
    }
}

#[derive(Debug)]
enum CfState {
    Loaded(CfModel),
    Unavailable,
}

/// Load-once CF predictor shared read-only across requests.
///
/// Concurrent first access is safe: `OnceLock` runs exactly one loader and
/// every other caller observes its result.
#[derive(Debug)]
pub struct CfPredictor {
    source: Option<PathBuf>,
    state: OnceLock<CfState>,
}

impl CfPredictor {
    /// Predictor that loads `path` on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            state: OnceLock::new(),
        }
    }

    /// Predictor over an already-built model
    pub fn from_model(model: CfModel) -> Self {
        Self {
            source: None,
            state: OnceLock::from(CfState::Loaded(model)),
        }
    }

    /// Predictor that never produces an estimate
    pub fn unavailable() -> Self {
        Self {
            source: None,
            state: OnceLock::from(CfState::Unavailable),
        }
    }

    /// Force the load now instead of on the first prediction.
    ///
    /// Returns whether the model is available afterwards.
    pub fn warm_up(&self) -> bool {
        self.is_available()
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state(), CfState::Loaded(_))
    }

    /// Raw estimate on the rating scale
    pub fn predict(&self, movie_id: MovieId) -> Option<f32> {
        match self.state() {
            CfState::Loaded(model) => model.predict(movie_id),
            CfState::Unavailable => None,
        }
    }

    /// Estimate rescaled to [0, 1]
    pub fn predict_normalized(&self, movie_id: MovieId) -> Option<f32> {
        self.predict(movie_id).map(normalize_cf_score)
    }

    fn state(&self) -> &CfState {
        self.state.get_or_init(|| match self.load() {
            Ok(model) => {
                info!(items = model.len(), "CF model loaded");
                CfState::Loaded(model)
            }
            Err(e) => {
                warn!(error = %e, "CF model unavailable; CF term disabled");
                CfState::Unavailable
            }
        })
    }

    fn load(&self) -> Result<CfModel, CfModelError> {
        let path = self.source.as_ref().ok_or(CfModelError::NotConfigured)?;
        let snapshot = CfSnapshot::load(path)?;
        Ok(CfModel::from_snapshot(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_model() -> CfModel {
        CfModel::from_snapshot(CfSnapshot {
            global_mean: 3.5,
            item_bias: vec![0.5, -4.0, 2.0],
            item_map: HashMap::from([(10, 0), (20, 1), (30, 2)]),
        })
    }

    #[test]
    fn test_predict_adds_bias_and_clips() {
        let model = create_test_model();

        assert_eq!(model.predict(10), Some(4.0));
        assert_eq!(model.predict(20), Some(RATING_MIN));
        assert_eq!(model.predict(30), Some(RATING_MAX));
        assert_eq!(model.predict(99), None);
    }

    #[test]
    fn test_normalize_cf_score() {
        assert_eq!(normalize_cf_score(RATING_MIN), 0.0);
        assert_eq!(normalize_cf_score(RATING_MAX), 1.0);
        assert!((normalize_cf_score(2.75) - 0.5).abs() < 1e-6);
        assert_eq!(normalize_cf_score(9.0), 1.0);
    }

    #[test]
    fn test_unavailable_predictor() {
        let predictor = CfPredictor::unavailable();

        assert!(!predictor.is_available());
        assert_eq!(predictor.predict(10), None);
        assert_eq!(predictor.predict_normalized(10), None);
    }

    #[test]
    fn test_missing_snapshot_becomes_unavailable() {
        let predictor = CfPredictor::new("/no/such/cf_model.json");

        assert!(!predictor.warm_up());
        assert_eq!(predictor.predict(10), None);
        // Terminal: stays unavailable
        assert!(!predictor.is_available());
    }

    #[test]
    fn test_preloaded_predictor() {
        let predictor = CfPredictor::from_model(create_test_model());

        assert!(predictor.is_available());
        assert!((predictor.predict_normalized(10).unwrap() - (3.5 / 4.5)).abs() < 1e-6);
    }

    #[test]
    fn test_concurrent_first_access_converges() {
        let dir = std::env::temp_dir().join(format!("cf-model-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cf_model.json");
        std::fs::write(
            &path,
            r#"{"global_mean": 3.0, "item_bias": [1.0], "item_map": {"7": 0}}"#,
        )
        .unwrap();

        let predictor = CfPredictor::new(&path);
        let results: Vec<Option<f32>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| predictor.predict(7)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| *r == Some(4.0)));
        assert!(predictor.is_available());
    }
}
