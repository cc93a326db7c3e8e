//! Capacity- and TTL-driven eviction.
//!
//! The manager is the only component that removes entries from both
//! structures, and it always tombstones the index entry before deleting
//! the store entry: an observer can momentarily see a store entry with no
//! index entry, but never a live index entry whose segment is gone.
//!
//! Capacity accounting is serialized through a single mutex shared with
//! ingestion, so two concurrent ingests cannot both evict expecting room
//! the other already consumed.

mod pin;

pub(crate) use pin::PinSet;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CacheResult;
use crate::index::EmbeddingIndex;
use crate::stats::StatsCollector;
use crate::store::SegmentStore;

/// Removes segments by TTL expiry and capacity pressure.
///
/// Cheap to clone; clones share all state.
#[derive(Debug, Clone)]
pub struct EvictionManager {
    store: SegmentStore,
    index: Arc<EmbeddingIndex>,
    pins: Arc<PinSet>,
    stats: Arc<StatsCollector>,
    capacity_gate: Arc<Mutex<()>>,
    max_entries: usize,
    sweep_batch_limit: usize,
    /// Position where the next expiry sweep resumes.
    sweep_cursor: Arc<AtomicUsize>,
}

impl EvictionManager {
    pub(crate) fn new(
        store: SegmentStore,
        index: Arc<EmbeddingIndex>,
        pins: Arc<PinSet>,
        stats: Arc<StatsCollector>,
        capacity_gate: Arc<Mutex<()>>,
        max_entries: usize,
        sweep_batch_limit: usize,
    ) -> Self {
        Self {
            store,
            index,
            pins,
            stats,
            capacity_gate,
            max_entries,
            sweep_batch_limit,
            sweep_cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn capacity_gate(&self) -> &Mutex<()> {
        &self.capacity_gate
    }

    /// Remove a segment from both structures: index tombstone first, then
    /// store delete. Returns whether the store held it.
    pub(crate) fn remove_entry(&self, id: &Uuid) -> CacheResult<bool> {
        self.index.remove(id);
        self.store.delete(id)
    }

    /// Sweep expired segments, bounded by the per-invocation batch limit
    /// so a backlog of expirations cannot starve concurrent work.
    ///
    /// The sweep resumes where the previous one left off, so entries past
    /// the batch limit are reached by later sweeps instead of sitting
    /// behind a stable prefix forever.
    pub fn sweep_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let mut removed = 0usize;
        let mut examined = 0usize;

        let mut ids = self.store.ids();
        if !ids.is_empty() {
            ids.sort_unstable();
            let start = self.sweep_cursor.load(Ordering::Relaxed) % ids.len();
            for offset in 0..ids.len() {
                if examined >= self.sweep_batch_limit {
                    debug!(
                        "expiry sweep stopped at batch limit ({} examined, {} removed)",
                        examined, removed
                    );
                    break;
                }
                let id = ids[(start + offset) % ids.len()];
                examined += 1;
                let Some(segment) = self.store.peek(&id)? else {
                    continue;
                };
                if !segment.is_expired(now) || self.pins.is_pinned(&id) {
                    continue;
                }
                if self.remove_entry(&id)? {
                    removed += 1;
                }
            }
            self.sweep_cursor.fetch_add(examined, Ordering::Relaxed);
        }

        if removed > 0 {
            self.stats.record_expired(removed as u64);
            info!("expiry sweep removed {} segments", removed);
        }
        self.compact_index()?;
        Ok(removed)
    }

    /// Evict least-recently-used segments until the store fits the
    /// capacity budget. Holds the capacity gate for the whole pass.
    pub fn enforce_capacity(&self) -> CacheResult<usize> {
        let mut evicted = 0usize;
        {
            let _gate = self.capacity_gate.lock();
            while self.store.len() > self.max_entries {
                let Some(victim) = self.select_victim(Utc::now())? else {
                    warn!(
                        "store over capacity ({} > {}) but no evictable segment",
                        self.store.len(),
                        self.max_entries
                    );
                    break;
                };
                if self.remove_entry(&victim)? {
                    evicted += 1;
                    debug!("evicted segment {} under capacity pressure", victim);
                }
            }
        }

        if evicted > 0 {
            self.stats.record_evictions(evicted as u64);
            self.compact_index()?;
        }
        Ok(evicted)
    }

    /// Run a full pass now: expiry sweep, capacity enforcement, and
    /// optionally `extra` additional LRU evictions beyond what pressure
    /// demands. Returns the total number of segments removed.
    pub fn evict_now(&self, extra: Option<usize>) -> CacheResult<usize> {
        let mut removed = self.sweep_expired()?;
        removed += self.enforce_capacity()?;

        if let Some(extra) = extra {
            let mut forced = 0usize;
            {
                let _gate = self.capacity_gate.lock();
                for _ in 0..extra {
                    let Some(victim) = self.select_victim(Utc::now())? else {
                        break;
                    };
                    if self.remove_entry(&victim)? {
                        forced += 1;
                    }
                }
            }
            if forced > 0 {
                self.stats.record_evictions(forced as u64);
                self.compact_index()?;
            }
            removed += forced;
        }
        Ok(removed)
    }

    /// Least-recently-used unpinned, non-expired segment; ties broken by
    /// earliest creation. Expired segments are left to the sweep.
    fn select_victim(&self, now: DateTime<Utc>) -> CacheResult<Option<Uuid>> {
        let mut best: Option<(DateTime<Utc>, DateTime<Utc>, Uuid)> = None;
        for id in self.store.ids() {
            if self.pins.is_pinned(&id) {
                continue;
            }
            let Some(segment) = self.store.peek(&id)? else {
                continue;
            };
            if segment.is_expired(now) {
                continue;
            }
            let candidate = (segment.last_accessed_at, segment.created_at, id);
            let better = match &best {
                None => true,
                Some(current) => (candidate.0, candidate.1) < (current.0, current.1),
            };
            if better {
                best = Some(candidate);
            }
        }
        Ok(best.map(|(_, _, id)| id))
    }

    fn compact_index(&self) -> CacheResult<()> {
        let compacted = self.index.compact_if_needed()?;
        if compacted > 0 {
            self.stats.record_compactions(compacted as u64);
        }
        Ok(())
    }
}
