//! Retrieval: exact lookup and similarity search.
//!
//! Candidates coming back from the index are pinned for the duration of
//! hydration so eviction cannot pull a segment out from under an
//! in-flight query. A candidate whose store entry is gone anyway (raced
//! with eviction or compaction before the pin landed) is skipped
//! silently; partial degradation is never a query failure.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ModalityDimensions;
use crate::error::{CacheError, CacheResult};
use crate::eviction::EvictionManager;
use crate::index::EmbeddingIndex;
use crate::stats::StatsCollector;
use crate::store::SegmentStore;
use crate::types::{RagQuery, RagResult, ScoredSegment, Segment};

/// Serves exact and similarity lookups, feeding access stats back into
/// LRU accounting.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    store: SegmentStore,
    index: Arc<EmbeddingIndex>,
    pins: Arc<crate::eviction::PinSet>,
    stats: Arc<StatsCollector>,
    eviction: EvictionManager,
    dimensions: ModalityDimensions,
}

impl RetrievalEngine {
    pub(crate) fn new(
        store: SegmentStore,
        index: Arc<EmbeddingIndex>,
        pins: Arc<crate::eviction::PinSet>,
        stats: Arc<StatsCollector>,
        eviction: EvictionManager,
        dimensions: ModalityDimensions,
    ) -> Self {
        Self {
            store,
            index,
            pins,
            stats,
            eviction,
            dimensions,
        }
    }

    /// Exact lookup by id. Expired segments are removed lazily and
    /// reported as absent.
    pub fn get(&self, id: &Uuid) -> CacheResult<Segment> {
        let pin = self.pins.pin_one(*id);
        let Some(segment) = self.store.peek(id)? else {
            self.stats.record_miss();
            return Err(CacheError::NotFound(*id));
        };

        if segment.is_expired(Utc::now()) {
            drop(pin);
            self.eviction.remove_entry(id)?;
            self.stats.record_expired(1);
            self.stats.record_miss();
            debug!("lazy-expired segment {} on exact lookup", id);
            return Err(CacheError::NotFound(*id));
        }

        let segment = self.store.get(id)?;
        self.stats.record_hit(segment.modality());
        Ok(segment)
    }

    /// Similarity search. Returns the ranked result plus a flag telling
    /// the cache that enough candidates dangled to suspect an index
    /// inconsistency worth reconciling.
    pub(crate) fn search(&self, query: &RagQuery) -> CacheResult<(RagResult, bool)> {
        self.validate_query(query)?;
        if query.k == 0 {
            return Ok((RagResult::empty(), false));
        }

        let started = Instant::now();

        // Over-fetch so expiry, modality and threshold filtering still
        // leave k survivors when enough exist.
        let fetch = query.k.saturating_add(query.k / 2).saturating_add(8);
        let candidates = self
            .index
            .search(query.modality, &query.embedding, fetch)?;
        let candidate_total = candidates.len();

        let candidate_ids: Vec<Uuid> = candidates.iter().map(|(id, _)| *id).collect();
        let _pins = self.pins.pin_many(&candidate_ids);

        let now = Utc::now();
        let mut survivors: Vec<(Segment, f32)> = Vec::with_capacity(candidates.len());
        let mut dangling = 0usize;
        let mut degraded = false;

        for (id, score) in candidates {
            if let Some(deadline) = query.deadline {
                if started.elapsed() >= deadline {
                    degraded = true;
                    warn!(
                        "search deadline of {:?} hit after {} candidates; returning partial result",
                        deadline,
                        survivors.len()
                    );
                    break;
                }
            }
            if let Some(min_score) = query.min_score {
                if score < min_score {
                    continue;
                }
            }
            let Some(segment) = self.store.peek(&id)? else {
                // Raced with eviction or compaction; degrade silently.
                dangling += 1;
                continue;
            };
            if segment.is_expired(now) {
                continue;
            }
            if let Some(modality) = query.modality {
                if segment.modality() != modality {
                    continue;
                }
            }
            survivors.push((segment, score));
        }

        survivors.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.last_accessed_at.cmp(&a.0.last_accessed_at))
        });
        survivors.truncate(query.k);

        let access_time = Utc::now();
        let mut hits = Vec::with_capacity(survivors.len());
        for (mut segment, score) in survivors {
            self.store.touch(&segment.id)?;
            segment.mark_accessed(access_time);
            self.stats.record_hit(segment.modality());
            hits.push(ScoredSegment { segment, score });
        }
        if hits.is_empty() {
            self.stats.record_miss();
        }

        let suspicious = candidate_total > 0 && dangling * 2 > candidate_total;
        if suspicious {
            warn!(
                "{} of {} search candidates had no store entry",
                dangling, candidate_total
            );
        }
        Ok((RagResult { hits, degraded }, suspicious))
    }

    /// Reject malformed queries before touching the index.
    fn validate_query(&self, query: &RagQuery) -> CacheResult<()> {
        if query.embedding.is_empty() {
            return Err(CacheError::validation("query embedding is empty"));
        }
        match query.modality {
            Some(modality) => {
                let expected = self.dimensions.get(modality);
                if query.embedding.len() != expected {
                    return Err(CacheError::Validation(format!(
                        "query dimension {} does not match configured {} for {} segments",
                        query.embedding.len(),
                        expected,
                        modality
                    )));
                }
            }
            None => {
                if !self.dimensions.matches(query.embedding.len()) {
                    return Err(CacheError::Validation(format!(
                        "query dimension {} matches no configured modality",
                        query.embedding.len()
                    )));
                }
            }
        }
        Ok(())
    }
}
