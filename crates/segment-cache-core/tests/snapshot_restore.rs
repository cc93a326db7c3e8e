//! Persisting the cache to disk and restoring it into a fresh instance.

use std::sync::Arc;

use segment_cache_core::{
    CacheConfig, CacheError, ModalityDimensions, RagQuery, SegmentCache, SegmentContent,
    SegmentDraft, StubEmbeddingProvider,
};

fn config() -> CacheConfig {
    CacheConfig {
        dimensions: ModalityDimensions::uniform(8),
        ..CacheConfig::default()
    }
}

fn cache() -> SegmentCache {
    SegmentCache::builder(config())
        .with_embedder(Arc::new(StubEmbeddingProvider::new(config().dimensions)))
        .build()
        .unwrap()
}

fn chat_draft(text: &str) -> SegmentDraft {
    SegmentDraft::new(SegmentContent::chat(text))
        .with_metadata("user_id", "u1")
        .with_metadata("session_id", "s1")
}

#[test]
fn persist_restore_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.snapshot");

    let original = cache();
    let chat = original.ingest(chat_draft("remember me")).unwrap();
    let audio = original
        .ingest(SegmentDraft::new(SegmentContent::audio("call.wav", 8_000)))
        .unwrap();
    original.persist(&path).unwrap();

    let restored = cache();
    assert_eq!(restored.restore(&path).unwrap(), 2);
    assert_eq!(restored.len(), 2);
    assert!(restored.health().is_consistent);

    let segment = restored.get(&chat).unwrap();
    assert_eq!(segment.content, SegmentContent::chat("remember me"));

    // The restored index serves similarity queries without re-embedding.
    let probe = restored.get(&audio).unwrap().embedding.clone();
    let results = restored.search(&RagQuery::new(probe, 1)).unwrap();
    assert_eq!(results.ids(), vec![audio]);
}

#[test]
fn restore_preserves_access_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.snapshot");

    let original = cache();
    let id = original.ingest(chat_draft("hot segment")).unwrap();
    original.get(&id).unwrap();
    original.get(&id).unwrap();
    original.persist(&path).unwrap();

    let restored = cache();
    restored.restore(&path).unwrap();
    let segment = restored.get(&id).unwrap();
    assert_eq!(segment.access_count, 3);
}

#[test]
fn missing_snapshot_file_is_a_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let cache = cache();
    let err = cache.restore(dir.path().join("absent.snapshot")).unwrap_err();
    assert!(matches!(err, CacheError::Store(_)));
}

#[test]
fn corrupt_snapshot_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.snapshot");
    std::fs::write(&path, b"not a snapshot").unwrap();

    let cache = cache();
    let err = cache.restore(&path).unwrap_err();
    assert!(err.is_critical());
}

#[test]
fn persisting_an_empty_cache_restores_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.snapshot");

    cache().persist(&path).unwrap();
    let restored = cache();
    assert_eq!(restored.restore(&path).unwrap(), 0);
    assert!(restored.is_empty());
}
