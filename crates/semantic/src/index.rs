//! In-memory vector index.
//!
//! Rows are L2-normalized once at build time so cosine similarity is a
//! plain dot product. Search scans every row in parallel and keeps the top
//! `k` with a partial selection instead of sorting the whole index.

use data_loader::{EmbeddingSnapshot, MovieId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    ids: Vec<MovieId>,
    dims: usize,
    /// Row-major, `ids.len() * dims`
    vectors: Vec<f32>,
}

fn l2_normalize(row: &mut [f32]) {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        row.iter_mut().for_each(|v| *v /= norm);
    }
}

fn by_score_desc(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

impl EmbeddingIndex {
    /// Build from a parsed snapshot; zero rows stay zero
    pub fn from_snapshot(snapshot: EmbeddingSnapshot) -> Self {
        let EmbeddingSnapshot { ids, matrix } = snapshot;
        let dims = matrix.cols;
        let mut vectors = matrix.data;

        if dims > 0 {
            vectors.par_chunks_mut(dims).for_each(l2_normalize);
        }

        Self { ids, dims, vectors }
    }

    /// Load and normalize the snapshot in `dir`
    pub fn load(dir: &Path) -> data_loader::Result<Self> {
        let index = Self::from_snapshot(EmbeddingSnapshot::load(dir)?);
        info!(
            "Loaded {} movie embeddings ({} dims, {:.1} MB)",
            index.len(),
            index.dims,
            (index.vectors.len() * std::mem::size_of::<f32>()) as f64 / 1024.0 / 1024.0
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() || self.dims == 0
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Top `k` movies by cosine similarity to `query`, best first.
    ///
    /// Returns nothing when `query` has the wrong dimension or no
    /// magnitude.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(MovieId, f32)> {
        if self.is_empty() || k == 0 || query.len() != self.dims {
            return Vec::new();
        }

        let mut query = query.to_vec();
        let norm = query.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= 0.0 || !norm.is_finite() {
            return Vec::new();
        }
        query.iter_mut().for_each(|v| *v /= norm);

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .par_chunks(self.dims)
            .map(|row| row.iter().zip(&query).map(|(a, b)| a * b).sum::<f32>())
            .enumerate()
            .collect();

        if k < scores.len() {
            scores.select_nth_unstable_by(k - 1, by_score_desc);
            scores.truncate(k);
        }
        scores.sort_by(by_score_desc);

        scores
            .into_iter()
            .map(|(row, score)| (self.ids[row], score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::NpyMatrix;

    fn create_test_index() -> EmbeddingIndex {
        EmbeddingIndex::from_snapshot(EmbeddingSnapshot {
            ids: vec![10, 20, 30, 40],
            matrix: NpyMatrix {
                rows: 4,
                cols: 2,
                data: vec![
                    3.0, 4.0, // 10
                    1.0, 0.0, // 20
                    0.0, 0.0, // 30
                    0.0, 2.0, // 40
                ],
            },
        })
    }

    #[test]
    fn test_rows_are_normalized() {
        let index = create_test_index();
        assert!((index.vectors[0] - 0.6).abs() < 1e-6);
        assert!((index.vectors[1] - 0.8).abs() < 1e-6);
        assert_eq!(&index.vectors[4..6], &[0.0, 0.0]);
    }

    #[test]
    fn test_top_k_order() {
        let index = create_test_index();
        let hits = index.search(&[10.0, 0.0], 2);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 20);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].0, 10);
        assert!((hits[1].1 - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_k_larger_than_index() {
        let index = create_test_index();
        let hits = index.search(&[0.0, 1.0], 300);

        let ids: Vec<MovieId> = hits.iter().map(|h| h.0).collect();
        assert_eq!(ids, vec![40, 10, 20, 30]);
    }

    #[test]
    fn test_bad_queries_return_nothing() {
        let index = create_test_index();
        assert!(index.search(&[1.0, 2.0, 3.0], 5).is_empty());
        assert!(index.search(&[0.0, 0.0], 5).is_empty());
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }
}
