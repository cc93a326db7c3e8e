//! Storage backend contract under the segment store.
//!
//! The engine is indifferent to whether segments live in process memory
//! or an external keyed store; everything above this trait sees the same
//! put/get/delete/exists surface. The default implementation is
//! [`MemoryBackend`](crate::store::MemoryBackend); a durable file-backed
//! variant lives in the `segment-cache-storage` crate.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::Segment;

/// Keyed segment storage.
///
/// # Contract
///
/// - `put` is an upsert: a second put with the same id overwrites.
/// - `get` is a pure read; access bookkeeping goes through `touch` so
///   that maintenance scans never skew LRU ordering.
/// - Independent ids must not contend; implementations are expected to
///   shard or lock per key.
///
/// # Object Safety
///
/// Usable as `Arc<dyn SegmentBackend>`; the store holds it that way.
pub trait SegmentBackend: Send + Sync + std::fmt::Debug {
    /// Insert or overwrite a segment.
    fn put(&self, segment: Segment) -> Result<(), StoreError>;

    /// Fetch a segment without touching its access bookkeeping.
    fn get(&self, id: &Uuid) -> Result<Option<Segment>, StoreError>;

    /// Remove a segment. Returns whether it was present.
    fn delete(&self, id: &Uuid) -> Result<bool, StoreError>;

    /// Whether a segment with this id is present.
    fn exists(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.get(id)?.is_some())
    }

    /// Bump `last_accessed_at` and `access_count` for a live segment.
    /// Returns whether the segment was present.
    ///
    /// The default read-modify-write is correct for backends whose `get`
    /// and `put` are individually atomic; backends with in-place update
    /// support should override it.
    fn touch(&self, id: &Uuid, when: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.get(id)? {
            Some(mut segment) => {
                segment.mark_accessed(when);
                self.put(segment)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Number of live segments.
    fn len(&self) -> usize;

    /// Whether the backend holds no segments.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live segments. Order is unspecified.
    fn ids(&self) -> Vec<Uuid>;

    /// Flush any buffered writes to durable storage. A no-op for purely
    /// memory-resident backends.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
