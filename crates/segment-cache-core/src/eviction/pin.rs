//! Reference-counted pinning of segments referenced by in-flight
//! retrievals.
//!
//! A pinned segment is ineligible for eviction until every guard holding
//! it drops. Counts live in a sharded map; pinning independent ids never
//! contends.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Shared pin counts.
#[derive(Debug, Default)]
pub(crate) struct PinSet {
    counts: DashMap<Uuid, usize>,
}

impl PinSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether any in-flight retrieval references this id.
    pub(crate) fn is_pinned(&self, id: &Uuid) -> bool {
        self.counts.contains_key(id)
    }

    /// Pin a batch of ids for the lifetime of the returned guard.
    pub(crate) fn pin_many(self: &Arc<Self>, ids: &[Uuid]) -> PinGuard {
        for id in ids {
            *self.counts.entry(*id).or_insert(0) += 1;
        }
        PinGuard {
            set: Arc::clone(self),
            ids: ids.to_vec(),
        }
    }

    /// Pin a single id.
    pub(crate) fn pin_one(self: &Arc<Self>, id: Uuid) -> PinGuard {
        self.pin_many(std::slice::from_ref(&id))
    }

    /// Decrement under the entry lock: a decrement-then-remove in two
    /// steps would let a concurrent pin land between them and be erased.
    fn release(&self, id: &Uuid) {
        match self.counts.entry(*id) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > 1 {
                    *entry.get_mut() -= 1;
                } else {
                    entry.remove();
                }
            }
            Entry::Vacant(_) => {}
        }
    }
}

/// RAII release of a batch of pins.
#[derive(Debug)]
pub(crate) struct PinGuard {
    set: Arc<PinSet>,
    ids: Vec<Uuid>,
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        for id in &self.ids {
            self.set.release(id);
        }
    }
}
