//! Default memory-resident storage backend.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::traits::SegmentBackend;
use crate::types::Segment;

/// Memory-resident [`SegmentBackend`].
///
/// Backed by a sharded concurrent map, so operations on independent ids
/// never contend and `touch` updates in place under the key's shard lock.
/// Data does not survive the process; pair the cache with the file
/// backend from `segment-cache-storage` when restart recovery matters.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: DashMap<Uuid, Segment>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for an expected entry count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: DashMap::with_capacity(capacity),
        }
    }
}

impl SegmentBackend for MemoryBackend {
    fn put(&self, segment: Segment) -> Result<(), StoreError> {
        self.data.insert(segment.id, segment);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Option<Segment>, StoreError> {
        Ok(self.data.get(id).map(|entry| entry.value().clone()))
    }

    fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.data.remove(id).is_some())
    }

    fn exists(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(id))
    }

    fn touch(&self, id: &Uuid, when: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.data.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().mark_accessed(when);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn ids(&self) -> Vec<Uuid> {
        self.data.iter().map(|entry| *entry.key()).collect()
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
            embedding: vec![0.5],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        }
    }

    #[test]
    fn touch_updates_in_place() {
        let backend = MemoryBackend::new();
        let segment = segment("a");
        let id = segment.id;
        backend.put(segment).unwrap();

        assert!(backend.touch(&id, Utc::now()).unwrap());
        assert!(backend.touch(&id, Utc::now()).unwrap());
        let got = backend.get(&id).unwrap().unwrap();
        assert_eq!(got.access_count, 2);
    }

    #[test]
    fn touch_missing_returns_false() {
        let backend = MemoryBackend::new();
        assert!(!backend.touch(&Uuid::new_v4(), Utc::now()).unwrap());
    }

    #[test]
    fn ids_lists_all_entries() {
        let backend = MemoryBackend::new();
        let a = segment("a");
        let b = segment("b");
        let (id_a, id_b) = (a.id, b.id);
        backend.put(a).unwrap();
        backend.put(b).unwrap();
        let mut ids = backend.ids();
        ids.sort();
        let mut expected = vec![id_a, id_b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
