//! Both index backends must behave identically; every check here runs
//! against each of them.

use anyhow::Result;
use facefuse::index::{GalleryEntry, LinearScanIndex, SearchHit, VectorIndex};
use facefuse::{Backend, IndexHandle, Matcher};
use proptest::prelude::*;
use std::sync::Arc;

type Build = fn(&[GalleryEntry]) -> Box<dyn VectorIndex>;

fn linear(entries: &[GalleryEntry]) -> Box<dyn VectorIndex> {
    Box::new(LinearScanIndex::build(entries))
}

#[cfg(feature = "native-index")]
fn native(entries: &[GalleryEntry]) -> Box<dyn VectorIndex> {
    Box::new(facefuse::index::NativeVectorIndex::build(entries))
}

fn backends() -> Vec<(&'static str, Build)> {
    #[allow(unused_mut)]
    let mut all = vec![("linear", linear as Build)];
    #[cfg(feature = "native-index")]
    all.push(("native", native as Build));
    all
}

fn entry(key: &str, vector: Vec<f32>) -> GalleryEntry {
    GalleryEntry {
        identity_key: key.to_string(),
        vector,
        version_tag: "v1".to_string(),
    }
}

fn keys(hits: &[SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.identity_key.as_str()).collect()
}

#[test]
fn two_identity_example() -> Result<()> {
    let gallery = vec![entry("A", vec![1.0, 0.0]), entry("B", vec![0.0, 1.0])];
    for (name, build) in backends() {
        let index = build(&gallery);
        let hits = index.query(&[0.9, 0.1], 2);
        assert_eq!(keys(&hits), vec!["A", "B"], "{name}");
        assert!((hits[0].score - 0.9939).abs() < 1e-3, "{name}: {}", hits[0].score);
        assert!((hits[1].score - 0.1104).abs() < 1e-3, "{name}: {}", hits[1].score);
    }
    Ok(())
}

#[test]
fn empty_gallery_returns_nothing() {
    for (name, build) in backends() {
        let index = build(&[]);
        assert!(index.is_empty(), "{name}");
        assert!(index.query(&[1.0, 0.0], 3).is_empty(), "{name}");
    }
}

#[test]
fn zero_query_returns_nothing() {
    let gallery = vec![entry("A", vec![1.0, 0.0])];
    for (name, build) in backends() {
        assert!(build(&gallery).query(&[0.0, 0.0], 1).is_empty(), "{name}");
    }
}

#[test]
fn wrong_length_query_returns_nothing() {
    let gallery = vec![entry("A", vec![1.0, 0.0])];
    for (name, build) in backends() {
        assert!(build(&gallery).query(&[1.0, 0.0, 0.0], 1).is_empty(), "{name}");
    }
}

#[test]
fn unusable_entries_are_skipped() {
    let gallery = vec![
        entry("empty", vec![]),
        entry("nan", vec![f32::NAN, 0.0]),
        entry("zero", vec![0.0, 0.0]),
        entry("A", vec![2.0, 0.0]),
        entry("long", vec![1.0, 0.0, 0.0]),
    ];
    for (name, build) in backends() {
        let index = build(&gallery);
        assert_eq!(index.len(), 1, "{name}");
        assert_eq!(index.dimension(), 2, "{name}");
        assert_eq!(keys(&index.query(&[1.0, 1.0], 5)), vec!["A"], "{name}");
    }
}

#[test]
fn unnormalized_vectors_score_by_direction() {
    let gallery = vec![entry("far", vec![100.0, 0.0]), entry("near", vec![0.1, 0.1])];
    for (name, build) in backends() {
        let hits = build(&gallery).query(&[5.0, 5.0], 2);
        assert_eq!(keys(&hits), vec!["near", "far"], "{name}");
        assert!((hits[0].score - 1.0).abs() < 1e-5, "{name}");
    }
}

#[test]
fn ties_keep_gallery_order_and_one_hit_per_identity() {
    let gallery = vec![
        entry("X", vec![0.0, 1.0]),
        entry("B", vec![1.0, 0.0]),
        entry("A", vec![1.0, 0.0]),
        entry("B", vec![0.7, 0.7]),
    ];
    for (name, build) in backends() {
        let hits = build(&gallery).query(&[1.0, 0.0], 3);
        assert_eq!(keys(&hits), vec!["B", "A", "X"], "{name}");
    }
}

#[test]
fn k_limits_results() {
    let gallery: Vec<_> = (0..10)
        .map(|i| entry(&format!("id{i}"), vec![1.0, i as f32]))
        .collect();
    for (name, build) in backends() {
        let index = build(&gallery);
        assert_eq!(index.query(&[1.0, 0.0], 4).len(), 4, "{name}");
        assert_eq!(index.query(&[1.0, 0.0], 0).len(), 1, "{name}");
        assert_eq!(index.query(&[1.0, 0.0], 50).len(), 10, "{name}");
    }
}

#[test]
fn matcher_on_empty_gallery_is_none() {
    for backend in [Backend::Linear, Backend::Auto] {
        let handle = Arc::new(IndexHandle::new(backend));
        handle.rebuild(&[]);
        let matcher = Matcher::new(handle, 0.85);
        assert_eq!(matcher.match_one(&[1.0, 0.0]), None);
    }
}

#[test]
fn matcher_example() {
    let handle = Arc::new(IndexHandle::new(Backend::Auto));
    handle.rebuild(&[entry("A", vec![1.0, 0.0]), entry("B", vec![0.0, 1.0])]);
    let hit = Matcher::new(handle, 0.85).match_one(&[0.9, 0.1]).unwrap();
    assert_eq!(hit.identity_key, "A");
    assert!(hit.is_match);
}

/// Same ranking from every backend; positions may only differ where the
/// scores themselves tie.
fn assert_same_ranking(a: &[SearchHit], b: &[SearchHit]) -> std::result::Result<(), TestCaseError> {
    prop_assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        prop_assert!((x.score - y.score).abs() <= 1e-5, "{} vs {}", x.score, y.score);
        if x.identity_key != y.identity_key {
            let tied = a
                .iter()
                .any(|h| h.identity_key == y.identity_key && (h.score - x.score).abs() <= 1e-5);
            prop_assert!(tied, "{:?} vs {:?}", x, y);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn backends_agree(
        rows in prop::collection::vec(prop::collection::vec(-1f32..1.0, 16), 0..40),
        query in prop::collection::vec(-1f32..1.0, 16),
        k in 1usize..8,
    ) {
        let gallery: Vec<_> = rows
            .into_iter()
            .enumerate()
            .map(|(i, v)| entry(&format!("id{}", i % 25), v))
            .collect();
        let results: Vec<Vec<SearchHit>> = backends()
            .into_iter()
            .map(|(_, build)| build(&gallery).query(&query, k))
            .collect();
        for other in &results[1..] {
            assert_same_ranking(&results[0], other)?;
        }
        for hits in &results {
            prop_assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
}
