//! Cosine-similarity search over a gallery that only changes by full rebuild.
//!
//! Two interchangeable backends answer queries: [`NativeVectorIndex`] keeps a
//! matrix of unit vectors and scores with a single matrix-vector product,
//! [`LinearScanIndex`] keeps the raw vectors and applies the cosine formula row
//! by row. Both skip the same unusable entries and rank identically.

mod handle;
mod linear;
#[cfg(feature = "native-index")]
mod native;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use handle::{GallerySource, IndexHandle};
pub use linear::LinearScanIndex;
#[cfg(feature = "native-index")]
pub use native::NativeVectorIndex;

/// Environment override for the backend, read once when an index handle is created
pub const BACKEND_ENV: &str = "FACEFUSE_INDEX_BACKEND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryEntry {
    pub identity_key: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub version_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub identity_key: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native when compiled in, linear scan otherwise
    #[default]
    Auto,
    Native,
    Linear,
}

impl Backend {
    pub fn native_available() -> bool {
        cfg!(feature = "native-index")
    }

    /// Pick the concrete backend, honouring [`BACKEND_ENV`] over the configured value.
    pub fn resolve(self) -> Backend {
        self.resolve_with(std::env::var(BACKEND_ENV).ok().as_deref())
    }

    pub fn resolve_with(self, env: Option<&str>) -> Backend {
        let requested = match env.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "linear" => Backend::Linear,
            Some(v) if v == "native" => Backend::Native,
            Some(v) if v == "auto" || v.is_empty() => self,
            Some(v) => {
                log::warn!("ignoring unknown {}={:?}", BACKEND_ENV, v);
                self
            }
            None => self,
        };

        match requested {
            Backend::Linear => Backend::Linear,
            Backend::Native | Backend::Auto if Self::native_available() => Backend::Native,
            Backend::Native => {
                log::warn!("native index requested but not compiled in, using linear scan");
                Backend::Linear
            }
            Backend::Auto => Backend::Linear,
        }
    }
}

/// A fully built, immutable snapshot of the gallery.
pub trait VectorIndex: Send + Sync {
    fn backend(&self) -> Backend;

    /// Number of indexed rows
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length every row shares, 0 when empty
    fn dimension(&self) -> usize;

    /// Best `k` identities by cosine similarity, highest first.
    ///
    /// Empty when the index is empty or the query is degenerate (zero, non-finite,
    /// or the wrong length). `k` below 1 is treated as 1.
    fn query(&self, vector: &[f32], k: usize) -> Vec<SearchHit>;
}

/// Build a snapshot with the given backend. `Auto` is resolved first.
pub fn build(backend: Backend, entries: &[GalleryEntry]) -> Arc<dyn VectorIndex> {
    match backend.resolve_with(None) {
        #[cfg(feature = "native-index")]
        Backend::Native => Arc::new(NativeVectorIndex::build(entries)),
        _ => Arc::new(LinearScanIndex::build(entries)),
    }
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Entries worth indexing and the dimension they share.
///
/// The first usable entry fixes the dimension; empty, non-finite,
/// zero-magnitude and differently sized vectors are skipped.
pub(crate) fn usable_entries(entries: &[GalleryEntry]) -> (usize, Vec<&GalleryEntry>) {
    let mut dim = 0;
    let mut kept = Vec::with_capacity(entries.len());
    for entry in entries {
        let v = &entry.vector;
        let reason = if v.is_empty() {
            Some("empty vector")
        } else if !v.iter().all(|x| x.is_finite()) {
            Some("non-finite component")
        } else if l2_norm(v) == 0.0 {
            Some("zero magnitude")
        } else if dim != 0 && v.len() != dim {
            Some("dimension mismatch")
        } else {
            None
        };

        match reason {
            Some(reason) => log::warn!("skipping gallery entry {:?}: {}", entry.identity_key, reason),
            None => {
                dim = v.len();
                kept.push(entry);
            }
        }
    }
    (dim, kept)
}

/// Whether a query can be compared against rows of length `dim`
pub(crate) fn query_usable(vector: &[f32], dim: usize) -> bool {
    if dim == 0 || vector.len() != dim {
        if dim != 0 {
            log::debug!("query length {} does not match index dimension {}", vector.len(), dim);
        }
        return false;
    }
    vector.iter().all(|x| x.is_finite()) && l2_norm(vector) > 0.0
}

/// Shared ranking: score descending, row position ascending, best row per identity.
pub(crate) fn rank(keys: &[String], scores: impl IntoIterator<Item = f32>, k: usize) -> Vec<SearchHit> {
    let mut scored: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut seen = HashSet::new();
    scored
        .into_iter()
        .filter(|(row, _)| seen.insert(keys[*row].as_str()))
        .take(k.max(1))
        .map(|(row, score)| SearchHit {
            identity_key: keys[row].clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, vector: Vec<f32>) -> GalleryEntry {
        GalleryEntry {
            identity_key: key.to_string(),
            vector,
            version_tag: "v1".to_string(),
        }
    }

    #[test]
    fn test_resolve_with_env() {
        assert_eq!(Backend::Native.resolve_with(Some("linear")), Backend::Linear);
        assert_eq!(Backend::Auto.resolve_with(Some("bogus")), Backend::Auto.resolve_with(None));
        assert_eq!(Backend::Linear.resolve_with(None), Backend::Linear);
        if Backend::native_available() {
            assert_eq!(Backend::Auto.resolve_with(None), Backend::Native);
            assert_eq!(Backend::Linear.resolve_with(Some("NATIVE")), Backend::Native);
        } else {
            assert_eq!(Backend::Native.resolve_with(None), Backend::Linear);
        }
    }

    #[test]
    fn test_usable_entries_skips_bad_vectors() {
        let entries = vec![
            entry("empty", vec![]),
            entry("nan", vec![f32::NAN, 1.0, 0.0]),
            entry("zero", vec![0.0, 0.0, 0.0]),
            entry("a", vec![1.0, 2.0, 3.0]),
            entry("short", vec![1.0, 2.0]),
            entry("b", vec![0.0, 0.0, 1.0]),
        ];
        let (dim, kept) = usable_entries(&entries);
        assert_eq!(dim, 3);
        let keys: Vec<_> = kept.iter().map(|e| e.identity_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_rank_dedupes_and_breaks_ties_by_row() {
        let keys: Vec<String> = ["a", "b", "a", "c"].iter().map(|s| s.to_string()).collect();
        let hits = rank(&keys, [0.5, 0.7, 0.9, 0.7], 3);
        let got: Vec<_> = hits.iter().map(|h| (h.identity_key.as_str(), h.score)).collect();
        assert_eq!(got, vec![("a", 0.9), ("b", 0.7), ("c", 0.7)]);
    }

    #[test]
    fn test_query_usable() {
        assert!(query_usable(&[1.0, 0.0], 2));
        assert!(!query_usable(&[0.0, 0.0], 2));
        assert!(!query_usable(&[1.0, 0.0, 0.0], 2));
        assert!(!query_usable(&[1.0, f32::INFINITY], 2));
        assert!(!query_usable(&[1.0], 0));
    }
}
