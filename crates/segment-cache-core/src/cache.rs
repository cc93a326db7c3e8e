//! The cache facade: wires the store, index, ingestion, retrieval and
//! eviction components together behind one handle.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult, StoreError};
use crate::eviction::{EvictionManager, PinSet};
use crate::index::{EmbeddingIndex, SpaceSnapshot};
use crate::ingest::IngestionPipeline;
use crate::retrieval::RetrievalEngine;
use crate::stats::{StatsCollector, StatsSnapshot};
use crate::store::{MemoryBackend, SegmentStore};
use crate::traits::{EmbeddingProvider, SegmentBackend};
use crate::types::{RagQuery, RagResult, Segment, SegmentDraft};

/// Serialized form of the whole cache: segments plus index state.
#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    segments: Vec<Segment>,
    spaces: Vec<SpaceSnapshot>,
}

/// Point-in-time consistency report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHealth {
    /// Segments held by the store.
    pub segment_count: usize,
    /// Live entries across all index spaces.
    pub indexed_count: usize,
    /// Tombstoned entries awaiting compaction.
    pub tombstone_count: usize,
    /// Whether store and index agree on the live id set.
    pub is_consistent: bool,
}

/// Builder for [`SegmentCache`].
///
/// Defaults to an in-memory backend and no embedding provider; drafts
/// must then carry their own embeddings.
pub struct SegmentCacheBuilder {
    config: CacheConfig,
    backend: Arc<dyn SegmentBackend>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl SegmentCacheBuilder {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            backend: Arc::new(MemoryBackend::new()),
            embedder: None,
        }
    }

    /// Swap the storage backend.
    pub fn with_backend(mut self, backend: Arc<dyn SegmentBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Attach an embedding provider for drafts without embeddings.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Validate the configuration and wire the components.
    pub fn build(self) -> CacheResult<SegmentCache> {
        self.config.validate()?;

        let store = SegmentStore::new(self.backend);
        let index = Arc::new(EmbeddingIndex::new(&self.config));
        let pins = Arc::new(PinSet::new());
        let stats = Arc::new(StatsCollector::new());
        let capacity_gate = Arc::new(Mutex::new(()));

        let eviction = EvictionManager::new(
            store.clone(),
            Arc::clone(&index),
            Arc::clone(&pins),
            Arc::clone(&stats),
            Arc::clone(&capacity_gate),
            self.config.max_entries,
            self.config.sweep_batch_limit,
        );
        let ingestion = IngestionPipeline::new(
            store.clone(),
            Arc::clone(&index),
            Arc::clone(&stats),
            eviction.clone(),
            self.embedder,
            self.config.dimensions,
            self.config.max_entries,
            self.config.evict_on_capacity,
            self.config.default_ttl,
        );
        let retrieval = RetrievalEngine::new(
            store.clone(),
            Arc::clone(&index),
            Arc::clone(&pins),
            Arc::clone(&stats),
            eviction.clone(),
            self.config.dimensions,
        );

        Ok(SegmentCache {
            store,
            index,
            stats,
            eviction,
            ingestion,
            retrieval,
            reconcile_retry_limit: self.config.reconcile_retry_limit,
        })
    }
}

/// A bounded cache of multimodal context segments with similarity
/// retrieval.
///
/// Cheap to clone; clones share all state and every operation is safe to
/// call from multiple threads.
#[derive(Debug, Clone)]
pub struct SegmentCache {
    store: SegmentStore,
    index: Arc<EmbeddingIndex>,
    stats: Arc<StatsCollector>,
    eviction: EvictionManager,
    ingestion: IngestionPipeline,
    retrieval: RetrievalEngine,
    reconcile_retry_limit: usize,
}

impl SegmentCache {
    /// Builder entry point.
    pub fn builder(config: CacheConfig) -> SegmentCacheBuilder {
        SegmentCacheBuilder::new(config)
    }

    /// A cache with default configuration and in-memory storage.
    pub fn with_defaults() -> CacheResult<Self> {
        Self::builder(CacheConfig::default()).build()
    }

    /// Ingest a draft segment. Returns the canonical, content-derived id.
    ///
    /// Ingesting the same content twice is an idempotent upsert.
    pub fn ingest(&self, draft: SegmentDraft) -> CacheResult<Uuid> {
        self.ingestion.ingest(draft)
    }

    /// Exact lookup by id. Counts as a cache hit or miss.
    pub fn get(&self, id: &Uuid) -> CacheResult<Segment> {
        self.retrieval.get(id)
    }

    /// Similarity search over the cached segments.
    ///
    /// If the search observes enough indexed ids without store entries to
    /// suspect an inconsistency, a reconciliation pass runs before the
    /// result is returned.
    pub fn search(&self, query: &RagQuery) -> CacheResult<RagResult> {
        let (result, suspicious) = self.retrieval.search(query)?;
        if suspicious {
            self.reconcile()?;
        }
        Ok(result)
    }

    /// Sweep expired segments, enforce the capacity bound, and optionally
    /// force `extra` additional LRU evictions. Returns segments removed.
    pub fn evict_now(&self, extra: Option<usize>) -> CacheResult<usize> {
        self.eviction.evict_now(extra)
    }

    /// Point-in-time counter snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of cached segments.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Compare the store's and the index's live id sets.
    pub fn health(&self) -> CacheHealth {
        let store_ids: HashSet<Uuid> = self.store.ids().into_iter().collect();
        let index_ids: HashSet<Uuid> = self.index.live_ids().into_iter().collect();
        CacheHealth {
            segment_count: store_ids.len(),
            indexed_count: index_ids.len(),
            tombstone_count: self.index.tombstone_count(),
            is_consistent: store_ids == index_ids,
        }
    }

    /// Repair store/index divergence: tombstone indexed ids with no
    /// segment, re-index segments the index lost.
    ///
    /// Bounded by the configured retry limit; if the structures still
    /// disagree after that many passes the error is surfaced instead of
    /// looping forever against a concurrent writer.
    pub fn reconcile(&self) -> CacheResult<()> {
        for attempt in 1..=self.reconcile_retry_limit {
            let store_ids: HashSet<Uuid> = self.store.ids().into_iter().collect();
            let index_ids: HashSet<Uuid> = self.index.live_ids().into_iter().collect();
            if store_ids == index_ids {
                return Ok(());
            }

            let mut repaired = 0usize;
            for id in index_ids.difference(&store_ids) {
                if self.index.remove(id) {
                    repaired += 1;
                }
            }
            for id in store_ids.difference(&index_ids) {
                let Some(segment) = self.store.peek(id)? else {
                    continue;
                };
                self.index
                    .insert(segment.id, segment.modality(), &segment.embedding)?;
                repaired += 1;
            }
            warn!(
                "reconciliation pass {}/{} repaired {} entries",
                attempt, self.reconcile_retry_limit, repaired
            );
            let compacted = self.index.compact_if_needed()?;
            if compacted > 0 {
                self.stats.record_compactions(compacted as u64);
            }
        }

        let health = self.health();
        if health.is_consistent {
            return Ok(());
        }
        Err(CacheError::IndexInconsistency(format!(
            "store holds {} segments but index holds {} after {} reconciliation passes",
            health.segment_count, health.indexed_count, self.reconcile_retry_limit
        )))
    }

    /// Write the full cache state to a file.
    ///
    /// Embeddings are persisted alongside segments, so restoring never
    /// re-embeds anything.
    pub fn persist(&self, path: impl AsRef<Path>) -> CacheResult<()> {
        let path = path.as_ref();
        let mut segments = Vec::with_capacity(self.store.len());
        for id in self.store.ids() {
            if let Some(segment) = self.store.peek(&id)? {
                segments.push(segment);
            }
        }
        let snapshot = CacheSnapshot {
            segments,
            spaces: self.index.snapshot(),
        };

        let file = File::create(path)
            .map_err(|e| StoreError::io(format!("creating snapshot file {}", path.display()), e))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        info!(
            "persisted {} segments to {}",
            snapshot.segments.len(),
            path.display()
        );
        Ok(())
    }

    /// Load cache state previously written by [`persist`](Self::persist)
    /// into this cache. Returns the number of segments restored.
    ///
    /// Snapshot vectors without a matching segment are dropped rather
    /// than restored as dangling index entries.
    pub fn restore(&self, path: impl AsRef<Path>) -> CacheResult<usize> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StoreError::io(format!("opening snapshot file {}", path.display()), e))?;
        let reader = BufReader::new(file);
        let snapshot: CacheSnapshot = bincode::deserialize_from(reader)
            .map_err(|e| StoreError::Corruption(format!("unreadable snapshot: {}", e)))?;

        let mut live = HashSet::with_capacity(snapshot.segments.len());
        let mut restored = 0usize;
        for segment in snapshot.segments {
            live.insert(segment.id);
            self.store.put(segment)?;
            restored += 1;
        }
        self.index.restore(&snapshot.spaces, &live)?;
        info!("restored {} segments from {}", restored, path.display());
        Ok(restored)
    }

    /// Flush the storage backend.
    pub fn flush(&self) -> CacheResult<()> {
        self.store.flush()
    }
}
