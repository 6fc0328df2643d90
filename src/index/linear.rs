use super::{query_usable, rank, usable_entries, Backend, GalleryEntry, SearchHit, VectorIndex};
use crate::matcher::cosine_similarity;

/// Fallback index: raw vectors, cosine similarity computed per row on every query
pub struct LinearScanIndex {
    keys: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl LinearScanIndex {
    pub fn build(entries: &[GalleryEntry]) -> Self {
        let (dim, usable) = usable_entries(entries);
        Self {
            keys: usable.iter().map(|e| e.identity_key.clone()).collect(),
            vectors: usable.iter().map(|e| e.vector.clone()).collect(),
            dim,
        }
    }
}

impl VectorIndex for LinearScanIndex {
    fn backend(&self) -> Backend {
        Backend::Linear
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn query(&self, vector: &[f32], k: usize) -> Vec<SearchHit> {
        if !query_usable(vector, self.dim) {
            return vec![];
        }
        rank(
            &self.keys,
            self.vectors.iter().map(|row| cosine_similarity(vector, row)),
            k,
        )
    }
}
