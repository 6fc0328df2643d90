use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::FuseError;
use crate::FaceObservation;

/// Tag stored next to every fused vector so galleries built with a different
/// descriptor model can be told apart.
pub const EMBEDDING_VERSION: &str = "v1";

/// Enrollment output: one unit vector plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedIdentityVector {
    pub vector: Vec<f32>,
    /// `source_index` of each selected frame, best first
    pub selected_indices: Vec<usize>,
    pub selected_scores: Vec<f32>,
    pub frames_processed: usize,
    pub frames_selected: usize,
    pub version: String,
}

/// Rank observations by score and fuse the best `top_k` of them.
///
/// Ties are broken by `source_index` so identical input always selects the
/// same frames. `scores` must be parallel to `observations`.
pub fn select_and_fuse(
    observations: &[FaceObservation],
    scores: &[f32],
    top_k: usize,
) -> Result<FusedIdentityVector, FuseError> {
    if observations.len() != scores.len() {
        return Err(FuseError::ScoreCountMismatch {
            observations: observations.len(),
            scores: scores.len(),
        });
    }
    if observations.is_empty() {
        return Err(FuseError::NoUsableFrames { frames: 0 });
    }

    let mut ranked: Vec<(&FaceObservation, f32)> = observations.iter().zip(scores.iter().copied()).collect();
    ranked.sort_by(|(a, sa), (b, sb)| sb.total_cmp(sa).then(a.source_index.cmp(&b.source_index)));
    ranked.truncate(top_k.max(1));

    let dim = ranked[0].0.vector.len();
    let mut stacked = Vec::with_capacity(ranked.len() * dim);
    for (obs, _) in &ranked {
        if obs.vector.len() != dim {
            return Err(FuseError::DimensionMismatch {
                expected: dim,
                found: obs.vector.len(),
                source_index: obs.source_index,
            });
        }
        stacked.extend_from_slice(&obs.vector);
    }

    let vector = fuse(stacked, ranked.len(), dim);
    log::debug!(
        "fused {} of {} frames into a {}-d vector",
        ranked.len(),
        observations.len(),
        dim
    );

    Ok(FusedIdentityVector {
        vector,
        selected_indices: ranked.iter().map(|(o, _)| o.source_index).collect(),
        selected_scores: ranked.iter().map(|(_, s)| *s).collect(),
        frames_processed: observations.len(),
        frames_selected: ranked.len(),
        version: EMBEDDING_VERSION.to_string(),
    })
}

/// Element-wise mean of `rows` row-major vectors, then L2-normalized.
/// A zero mean is passed through unchanged.
fn fuse(stacked: Vec<f32>, rows: usize, dim: usize) -> Vec<f32> {
    let matrix = match Array2::from_shape_vec((rows, dim), stacked) {
        Ok(m) => m,
        Err(_) => return vec![0.0; dim],
    };
    let mean: Array1<f32> = matrix.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(dim));
    let norm = mean.dot(&mean).sqrt();
    if norm > 0.0 && norm.is_finite() {
        (mean / norm).to_vec()
    } else {
        mean.to_vec()
    }
}
