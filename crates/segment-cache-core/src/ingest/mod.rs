//! Ingestion: validation, canonical ids, embedding acquisition, and the
//! store-then-index write path.
//!
//! Write ordering is fixed: the store write lands first, then the index
//! insert. If the index insert fails the store write is rolled back, so
//! no query can ever surface an indexed vector without a live segment.
//! Because ids are content-derived, concurrent ingestion of the same
//! content is a pair of idempotent upserts; the later writer wins without
//! corrupting either structure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::config::ModalityDimensions;
use crate::error::{CacheError, CacheResult};
use crate::eviction::EvictionManager;
use crate::index::EmbeddingIndex;
use crate::stats::StatsCollector;
use crate::store::SegmentStore;
use crate::traits::EmbeddingProvider;
use crate::types::{Segment, SegmentContent, SegmentDraft};

/// Validates and writes incoming segments through both structures.
#[derive(Clone)]
pub struct IngestionPipeline {
    store: SegmentStore,
    index: Arc<EmbeddingIndex>,
    stats: Arc<StatsCollector>,
    eviction: EvictionManager,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    dimensions: ModalityDimensions,
    max_entries: usize,
    evict_on_capacity: bool,
    default_ttl: Option<Duration>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("dimensions", &self.dimensions)
            .field("max_entries", &self.max_entries)
            .field("evict_on_capacity", &self.evict_on_capacity)
            .field("has_embedder", &self.embedder.is_some())
            .finish()
    }
}

impl IngestionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        store: SegmentStore,
        index: Arc<EmbeddingIndex>,
        stats: Arc<StatsCollector>,
        eviction: EvictionManager,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        dimensions: ModalityDimensions,
        max_entries: usize,
        evict_on_capacity: bool,
        default_ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            index,
            stats,
            eviction,
            embedder,
            dimensions,
            max_entries,
            evict_on_capacity,
            default_ttl,
        }
    }

    /// Validate, embed if necessary, and write a draft through both
    /// structures. Returns the canonical id.
    pub fn ingest(&self, draft: SegmentDraft) -> CacheResult<Uuid> {
        validate_draft(&draft.content, &draft.metadata)?;

        let modality = draft.content.modality();
        let expected = self.dimensions.get(modality);
        let embedding = match draft.embedding {
            Some(vector) => {
                if vector.len() != expected {
                    return Err(CacheError::Validation(format!(
                        "embedding dimension {} does not match configured {} for {} segments",
                        vector.len(),
                        expected,
                        modality
                    )));
                }
                vector
            }
            None => self.embed(&draft.content)?,
        };

        let id = Segment::canonical_id(&draft.content);
        let now = Utc::now();
        let segment = Segment {
            id,
            content: draft.content,
            metadata: draft.metadata,
            embedding,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: draft.ttl.or(self.default_ttl),
        };

        if self.evict_on_capacity {
            self.write_through(segment)?;
            self.eviction.enforce_capacity()?;
        } else {
            // With eviction disabled the capacity check and the writes
            // must be one serialized section, or two concurrent ingests
            // could both squeeze past the hard limit.
            let _gate = self.eviction.capacity_gate().lock();
            if self.store.len() >= self.max_entries && !self.store.exists(&id)? {
                return Err(CacheError::CapacityExceeded {
                    capacity: self.max_entries,
                });
            }
            self.write_through(segment)?;
        }

        self.stats.record_ingest();
        debug!("ingested {} segment {}", modality, id);
        Ok(id)
    }

    fn embed(&self, content: &SegmentContent) -> CacheResult<Vec<f32>> {
        let modality = content.modality();
        let provider = self.embedder.as_ref().ok_or_else(|| {
            CacheError::Embedding(
                "draft carries no embedding and no embedding provider is configured".into(),
            )
        })?;
        let vector = provider.embed(content)?;
        let expected = self.dimensions.get(modality);
        if vector.len() != expected {
            return Err(CacheError::Embedding(format!(
                "provider returned {} dimensions, expected {} for {} segments",
                vector.len(),
                expected,
                modality
            )));
        }
        Ok(vector)
    }

    /// Store first, then index; roll the store write back if the index
    /// insert fails.
    fn write_through(&self, segment: Segment) -> CacheResult<()> {
        let id = segment.id;
        let modality = segment.modality();
        let embedding = segment.embedding.clone();

        self.store.put(segment)?;
        if let Err(index_err) = self.index.insert(id, modality, &embedding) {
            warn!(
                "index insert failed for segment {}, rolling back store write: {}",
                id, index_err
            );
            if let Err(rollback_err) = self.store.delete(&id) {
                // The entry is unreachable through search either way; the
                // next reconciliation pass will not find it in the index.
                error!(
                    "rollback delete failed for segment {}: {}",
                    id, rollback_err
                );
            }
            return Err(CacheError::IngestionFailed {
                id,
                reason: index_err.to_string(),
            });
        }
        Ok(())
    }
}

/// Check modality-specific required fields before any write.
fn validate_draft(
    content: &SegmentContent,
    metadata: &HashMap<String, serde_json::Value>,
) -> CacheResult<()> {
    match content {
        SegmentContent::Chat { text } => {
            if text.trim().is_empty() {
                return Err(CacheError::validation("chat segment has empty text"));
            }
        }
        SegmentContent::Audio {
            source,
            sample_rate_hz,
            ..
        } => {
            if source.trim().is_empty() {
                return Err(CacheError::validation("audio segment has empty source"));
            }
            if *sample_rate_hz == 0 {
                return Err(CacheError::validation(
                    "audio segment has zero sample rate",
                ));
            }
        }
        SegmentContent::Video { source, .. } => {
            if source.trim().is_empty() {
                return Err(CacheError::validation("video segment has empty source"));
            }
        }
    }

    let modality = content.modality();
    for key in modality.profile().required_metadata {
        if !metadata.contains_key(*key) {
            return Err(CacheError::Validation(format!(
                "{} segment is missing required metadata key '{}'",
                modality, key
            )));
        }
    }
    Ok(())
}
