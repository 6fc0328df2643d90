use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index::IndexHandle;

/// Default decision threshold on the cosine scale `[-1, 1]`.
///
/// Not calibrated for any particular descriptor model; tune it against labeled
/// pairs before relying on it.
pub const DEFAULT_THRESHOLD: f32 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub identity_key: String,
    pub score: f32,
    pub is_match: bool,
}

/// Best-match lookup with a match / no-match decision
pub struct Matcher {
    index: Arc<IndexHandle>,
    pub threshold: f32,
}

impl Matcher {
    pub fn new(index: Arc<IndexHandle>, threshold: f32) -> Self {
        Self { index, threshold }
    }

    /// Top identity for `query`, or `None` when the gallery is empty or the
    /// query carries no direction. `None` means "unknown", not failure.
    pub fn match_one(&self, query: &[f32]) -> Option<Match> {
        self.match_top(query, 1)
    }

    pub fn match_top(&self, query: &[f32], k: usize) -> Option<Match> {
        let best = self.index.query(query, k).into_iter().next()?;
        Some(Match {
            is_match: best.score > self.threshold,
            identity_key: best.identity_key,
            score: best.score,
        })
    }
}

/// Cosine similarity of two raw vectors, clamped to `[-1, 1]`.
///
/// 0.0 when either side is empty or zero, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0)
}
