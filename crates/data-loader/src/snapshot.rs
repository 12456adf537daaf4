//! Precomputed model snapshots.
//!
//! Two static artifacts are produced offline and only read here:
//!
//! - the CF bias model, a JSON document
//!   `{"global_mean": f, "item_bias": [f, ...], "item_map": {"<movie id>": row}}`
//! - the embedding matrix, a NumPy `.npy` file (little-endian f4 or f8,
//!   C order, shape N x D) with a sibling `movie_id_index.json` mapping
//!   row number to movie id (`{"0": 603, "1": 27205, ...}`)
//!
//! Parsing validates shapes and index ranges so consumers can index without
//! bounds surprises.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{DataLoadError, Result};
use crate::parser::read_to_string;
use crate::types::MovieId;

pub const EMBEDDINGS_FILE: &str = "movie_embeddings.npy";
pub const ID_INDEX_FILE: &str = "movie_id_index.json";

// =============================================================================
// CF bias model
// =============================================================================

/// Global-mean + item-bias model fitted offline
#[derive(Debug, Clone, Deserialize)]
pub struct CfSnapshot {
    pub global_mean: f32,
    pub item_bias: Vec<f32>,
    /// Movie id -> position in `item_bias`
    pub item_map: HashMap<MovieId, usize>,
}

impl CfSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        let file = path.display().to_string();
        let snapshot: CfSnapshot =
            serde_json::from_str(&content).map_err(|source| DataLoadError::Json {
                file: file.clone(),
                source,
            })?;
        snapshot.validate(&file)?;

        debug!(
            items = snapshot.item_map.len(),
            global_mean = snapshot.global_mean,
            "Parsed CF snapshot"
        );
        Ok(snapshot)
    }

    fn validate(&self, file: &str) -> Result<()> {
        let malformed = |reason: String| DataLoadError::MalformedSnapshot {
            file: file.to_string(),
            reason,
        };

        if !self.global_mean.is_finite() {
            return Err(malformed("global_mean is not finite".to_string()));
        }
        if let Some((id, idx)) = self
            .item_map
            .iter()
            .find(|(_, idx)| **idx >= self.item_bias.len())
        {
            return Err(malformed(format!(
                "movie {} maps to row {} but item_bias has {} entries",
                id,
                idx,
                self.item_bias.len()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Embedding matrix
// =============================================================================

/// Dense row-major f32 matrix read from an `.npy` file
#[derive(Debug, Clone)]
pub struct NpyMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

/// Raw embedding snapshot: one row per movie, row order matching `ids`
#[derive(Debug, Clone)]
pub struct EmbeddingSnapshot {
    pub ids: Vec<MovieId>,
    pub matrix: NpyMatrix,
}

impl EmbeddingSnapshot {
    /// Load `movie_embeddings.npy` and `movie_id_index.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let matrix_path = dir.join(EMBEDDINGS_FILE);
        let ids_path = dir.join(ID_INDEX_FILE);

        let (matrix, ids) = rayon::join(
            || -> Result<NpyMatrix> {
                let bytes = std::fs::read(&matrix_path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
                        path: matrix_path.display().to_string(),
                    },
                    _ => DataLoadError::IoError(e),
                })?;
                parse_npy(&bytes, EMBEDDINGS_FILE)
            },
            || parse_id_index(&ids_path),
        );
        let matrix = matrix?;
        let ids = ids?;

        if ids.len() != matrix.rows {
            return Err(DataLoadError::MalformedSnapshot {
                file: ID_INDEX_FILE.to_string(),
                reason: format!("{} ids for {} embedding rows", ids.len(), matrix.rows),
            });
        }

        debug!(rows = matrix.rows, dims = matrix.cols, "Parsed embedding snapshot");
        Ok(Self { ids, matrix })
    }
}

/// Parse `{"<row>": movie_id}` into a row-ordered id vector
pub fn parse_id_index(path: &Path) -> Result<Vec<MovieId>> {
    let content = read_to_string(path)?;
    let file = path.display().to_string();
    let raw: HashMap<String, MovieId> =
        serde_json::from_str(&content).map_err(|source| DataLoadError::Json {
            file: file.clone(),
            source,
        })?;

    let mut ids = vec![None; raw.len()];
    for (row, id) in raw {
        let slot = row
            .parse::<usize>()
            .ok()
            .and_then(|r| ids.get_mut(r))
            .ok_or_else(|| DataLoadError::MalformedSnapshot {
                file: file.clone(),
                reason: format!("row key {:?} is not a dense row number", row),
            })?;
        *slot = Some(id);
    }

    // Dense keys 0..n fill every slot exactly once
    ids.into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| DataLoadError::MalformedSnapshot {
            file,
            reason: "duplicate row keys".to_string(),
        })
}

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Parse a version 1-3 `.npy` payload holding a 2-D float array
pub fn parse_npy(bytes: &[u8], file: &str) -> Result<NpyMatrix> {
    let malformed = |reason: &str| DataLoadError::MalformedSnapshot {
        file: file.to_string(),
        reason: reason.to_string(),
    };

    if bytes.len() < 10 || !bytes.starts_with(NPY_MAGIC) {
        return Err(malformed("missing NUMPY magic"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
            12,
        ),
        _ => return Err(malformed("unsupported format version")),
    };

    let payload_start = header_start + header_len;
    let header = bytes
        .get(header_start..payload_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| malformed("truncated header"))?;

    let descr = header_value(header, "descr")
        .and_then(|v| v.strip_prefix('\''))
        .and_then(|v| v.split('\'').next())
        .ok_or_else(|| malformed("missing descr"))?;
    let fortran = header_value(header, "fortran_order")
        .map(|v| v.starts_with("True"))
        .ok_or_else(|| malformed("missing fortran_order"))?;
    let shape = header_value(header, "shape")
        .and_then(parse_shape)
        .ok_or_else(|| malformed("missing or invalid shape"))?;

    if fortran {
        return Err(malformed("fortran-ordered arrays are not supported"));
    }
    let &[rows, cols] = shape.as_slice() else {
        return Err(malformed("expected a 2-D array"));
    };

    let payload = &bytes[payload_start..];
    let data: Vec<f32> = match descr {
        "<f4" => {
            check_payload(payload.len(), rows, cols, 4).map_err(|r| malformed(&r))?;
            payload
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
        "<f8" => {
            check_payload(payload.len(), rows, cols, 8).map_err(|r| malformed(&r))?;
            payload
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
                .collect()
        }
        other => {
            return Err(malformed(&format!("unsupported dtype {}", other)));
        }
    };

    Ok(NpyMatrix { rows, cols, data })
}

fn check_payload(actual: usize, rows: usize, cols: usize, width: usize) -> std::result::Result<(), String> {
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| format!("shape ({}, {}) overflows the addressable size", rows, cols))?;
    if actual == expected {
        Ok(())
    } else {
        Err(format!("payload is {} bytes, shape needs {}", actual, expected))
    }
}

/// Text following `'key':` in the header dict
fn header_value<'h>(header: &'h str, key: &str) -> Option<&'h str> {
    let quoted = format!("'{}'", key);
    let start = header.find(&quoted)? + quoted.len();
    let rest = header[start..].trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

fn parse_shape(value: &str) -> Option<Vec<usize>> {
    let inner = value.strip_prefix('(')?.split(')').next()?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}
