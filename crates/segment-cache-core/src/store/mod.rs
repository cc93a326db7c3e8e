//! Segment storage: the store facade and the default in-memory backend.

mod memory;

pub use memory::MemoryBackend;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CacheError, CacheResult};
use crate::traits::SegmentBackend;
use crate::types::Segment;

/// Keyed segment storage with upsert semantics and access bookkeeping.
///
/// Thin facade over an [`SegmentBackend`]: the facade owns the semantics
/// (`get` bumps access stats, `peek` does not), the backend owns the
/// bytes. Cheap to clone; clones share the backend.
#[derive(Debug, Clone)]
pub struct SegmentStore {
    backend: Arc<dyn SegmentBackend>,
}

impl SegmentStore {
    pub(crate) fn new(backend: Arc<dyn SegmentBackend>) -> Self {
        Self { backend }
    }

    /// Insert or overwrite a segment, returning its id.
    pub fn put(&self, segment: Segment) -> CacheResult<Uuid> {
        let id = segment.id;
        self.backend.put(segment)?;
        Ok(id)
    }

    /// Fetch a segment and record the access.
    ///
    /// The returned copy reflects the bumped `last_accessed_at` and
    /// `access_count`.
    pub fn get(&self, id: &Uuid) -> CacheResult<Segment> {
        if !self.backend.touch(id, Utc::now())? {
            return Err(CacheError::NotFound(*id));
        }
        // Raced deletion between touch and get maps to NotFound as well.
        self.backend
            .get(id)?
            .ok_or(CacheError::NotFound(*id))
    }

    /// Fetch a segment without recording the access. Maintenance scans
    /// and candidate hydration use this so they never skew LRU ordering.
    pub fn peek(&self, id: &Uuid) -> CacheResult<Option<Segment>> {
        Ok(self.backend.get(id)?)
    }

    /// Record an access for a live segment.
    pub fn touch(&self, id: &Uuid) -> CacheResult<bool> {
        Ok(self.backend.touch(id, Utc::now())?)
    }

    /// Remove a segment. Returns whether it was present.
    pub fn delete(&self, id: &Uuid) -> CacheResult<bool> {
        Ok(self.backend.delete(id)?)
    }

    /// Whether a segment with this id is present.
    pub fn exists(&self, id: &Uuid) -> CacheResult<bool> {
        Ok(self.backend.exists(id)?)
    }

    /// Number of live segments.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Whether the store holds no segments.
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// Ids of all live segments. Order is unspecified.
    pub fn ids(&self) -> Vec<Uuid> {
        self.backend.ids()
    }

    /// Flush buffered writes through to the backend.
    pub fn flush(&self) -> CacheResult<()> {
        Ok(self.backend.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::SegmentContent;

    fn segment(text: &str) -> Segment {
        let content = SegmentContent::chat(text);
        let now = Utc::now();
        Segment {
            id: Segment::canonical_id(&content),
            content,
            metadata: HashMap::new(),
            embedding: vec![1.0, 0.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        }
    }

    fn store() -> SegmentStore {
        SegmentStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn put_get_round_trip() {
        let store = store();
        let segment = segment("hello");
        let id = store.put(segment.clone()).unwrap();
        let got = store.get(&id).unwrap();
        assert_eq!(got.content, segment.content);
        assert_eq!(got.embedding, segment.embedding);
    }

    #[test]
    fn get_bumps_access_stats_peek_does_not() {
        let store = store();
        let id = store.put(segment("hello")).unwrap();

        let first = store.get(&id).unwrap();
        assert_eq!(first.access_count, 1);
        let second = store.get(&id).unwrap();
        assert_eq!(second.access_count, 2);
        assert!(second.last_accessed_at >= first.last_accessed_at);

        let peeked = store.peek(&id).unwrap().unwrap();
        assert_eq!(peeked.access_count, 2);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = store();
        let err = store.get(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CacheError::NotFound(_)));
    }

    #[test]
    fn put_same_id_overwrites() {
        let store = store();
        let mut updated = segment("hello");
        let id = store.put(updated.clone()).unwrap();
        updated.metadata.insert("model".into(), "gpt-4".into());
        store.put(updated).unwrap();
        assert_eq!(store.len(), 1);
        let got = store.peek(&id).unwrap().unwrap();
        assert_eq!(got.metadata.get("model").unwrap(), "gpt-4");
    }

    #[test]
    fn delete_and_exists() {
        let store = store();
        let id = store.put(segment("bye")).unwrap();
        assert!(store.exists(&id).unwrap());
        assert!(store.delete(&id).unwrap());
        assert!(!store.exists(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.is_empty());
    }
}
