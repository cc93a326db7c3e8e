//! Similarity search ranking, filtering and degradation.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segment_cache_core::{
    CacheConfig, CacheError, Modality, ModalityDimensions, RagQuery, SegmentCache, SegmentContent,
    SegmentDraft,
};

fn cache() -> SegmentCache {
    SegmentCache::builder(CacheConfig {
        dimensions: ModalityDimensions::uniform(4),
        ..CacheConfig::default()
    })
    .build()
    .unwrap()
}

fn chat_draft(text: &str, embedding: Vec<f32>) -> SegmentDraft {
    SegmentDraft::new(SegmentContent::chat(text))
        .with_metadata("user_id", "u1")
        .with_metadata("session_id", "s1")
        .with_embedding(embedding)
}

#[test]
fn nearest_neighbor_wins_at_k1() {
    let cache = cache();
    let a = cache
        .ingest(chat_draft("about dogs", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    cache
        .ingest(chat_draft("about cats", vec![0.0, 1.0, 0.0, 0.0]))
        .unwrap();

    // Probe near A's direction.
    let results = cache
        .search(&RagQuery::new(vec![0.9, 0.1, 0.0, 0.0], 1))
        .unwrap();
    assert_eq!(results.ids(), vec![a]);
    assert!(!results.degraded);
}

#[test]
fn scores_are_monotonically_non_increasing() {
    let cache = cache();
    let mut rng = StdRng::seed_from_u64(42);
    for n in 0..50 {
        let embedding: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
        cache
            .ingest(chat_draft(&format!("segment {n}"), embedding))
            .unwrap();
    }

    let probe: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let results = cache.search(&RagQuery::new(probe, 10)).unwrap();
    assert!(!results.is_empty());
    for pair in results.hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn min_score_filters_weak_matches() {
    let cache = cache();
    let close = cache
        .ingest(chat_draft("close", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    cache
        .ingest(chat_draft("orthogonal", vec![0.0, 0.0, 1.0, 0.0]))
        .unwrap();

    let query = RagQuery::new(vec![1.0, 0.05, 0.0, 0.0], 10).with_min_score(0.9);
    let results = cache.search(&query).unwrap();
    assert_eq!(results.ids(), vec![close]);
    assert!(results.hits[0].score >= 0.9);
}

#[test]
fn modality_filter_restricts_results() {
    let cache = cache();
    cache
        .ingest(chat_draft("a chat", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    let audio = cache
        .ingest(
            SegmentDraft::new(SegmentContent::audio("clip.wav", 16_000))
                .with_embedding(vec![0.99, 0.01, 0.0, 0.0]),
        )
        .unwrap();

    let query = RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 10).with_modality(Modality::Audio);
    let results = cache.search(&query).unwrap();
    assert_eq!(results.ids(), vec![audio]);
}

#[test]
fn unfiltered_search_spans_modalities_of_equal_dimension() {
    let cache = cache();
    cache
        .ingest(chat_draft("a chat", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    cache
        .ingest(
            SegmentDraft::new(SegmentContent::video("demo.mp4"))
                .with_embedding(vec![0.9, 0.1, 0.0, 0.0]),
        )
        .unwrap();

    let results = cache
        .search(&RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 10))
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn empty_cache_returns_empty_result() {
    let cache = cache();
    let results = cache
        .search(&RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 5))
        .unwrap();
    assert!(results.is_empty());
    assert!(!results.degraded);
}

#[test]
fn k_zero_returns_empty_result() {
    let cache = cache();
    cache
        .ingest(chat_draft("present", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    let results = cache
        .search(&RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 0))
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn mismatched_query_dimension_is_rejected() {
    let cache = cache();
    let err = cache
        .search(&RagQuery::new(vec![1.0, 0.0], 5))
        .unwrap_err();
    assert!(matches!(err, CacheError::Validation(_)));

    let err = cache
        .search(&RagQuery::new(vec![], 5))
        .unwrap_err();
    assert!(matches!(err, CacheError::Validation(_)));
}

#[test]
fn exhausted_deadline_degrades_instead_of_failing() {
    let cache = cache();
    cache
        .ingest(chat_draft("present", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();

    let query =
        RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 5).with_deadline(Duration::ZERO);
    let results = cache.search(&query).unwrap();
    assert!(results.degraded);
    assert!(results.is_empty());
}

#[test]
fn search_bumps_recency_of_returned_segments() {
    let cache = cache();
    let id = cache
        .ingest(chat_draft("bumped", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();

    let results = cache
        .search(&RagQuery::new(vec![1.0, 0.0, 0.0, 0.0], 1))
        .unwrap();
    assert_eq!(results.hits[0].segment.access_count, 1);

    let segment = cache.get(&id).unwrap();
    assert_eq!(segment.access_count, 2);
}
