use ndarray::{Array1, Array2};

use super::{l2_norm, query_usable, rank, usable_entries, Backend, GalleryEntry, SearchHit, VectorIndex};

/// Matrix-backed index: every row is stored pre-normalized so a query is one
/// inner product against the whole gallery.
pub struct NativeVectorIndex {
    keys: Vec<String>,
    matrix: Array2<f32>,
}

impl NativeVectorIndex {
    pub fn build(entries: &[GalleryEntry]) -> Self {
        let (dim, usable) = usable_entries(entries);
        let mut data = Vec::with_capacity(usable.len() * dim);
        for entry in &usable {
            let norm = l2_norm(&entry.vector);
            data.extend(entry.vector.iter().map(|x| x / norm));
        }
        let matrix = Array2::from_shape_vec((usable.len(), dim), data)
            .unwrap_or_else(|_| Array2::zeros((0, 0)));
        Self {
            keys: usable.iter().map(|e| e.identity_key.clone()).collect(),
            matrix,
        }
    }
}

impl VectorIndex for NativeVectorIndex {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn len(&self) -> usize {
        self.matrix.nrows()
    }

    fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    fn query(&self, vector: &[f32], k: usize) -> Vec<SearchHit> {
        if !query_usable(vector, self.dimension()) {
            return vec![];
        }
        let norm = l2_norm(vector);
        let query: Array1<f32> = vector.iter().map(|x| x / norm).collect();
        let scores = self.matrix.dot(&query);
        rank(&self.keys, scores.iter().map(|s| s.clamp(-1.0, 1.0)), k)
    }
}
