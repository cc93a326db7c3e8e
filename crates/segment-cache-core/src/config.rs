//! Cache configuration types.
//!
//! `CacheConfig` carries everything a `SegmentCache` instance needs at
//! construction time: the capacity budget, per-modality embedding
//! dimensions, the distance metric, and the maintenance knobs (compaction
//! threshold, sweep batch limit, reconciliation retry budget).
//!
//! All values have working defaults; callers typically override only the
//! dimensions and `max_entries`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::types::Modality;

/// Distance metric for vector similarity computation.
///
/// Fixed per cache instance: all index spaces share one metric so that
/// scores from different modalities are comparable in merged results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine distance: `1 - cos(a, b)`. Similarity is `cos(a, b)`.
    Cosine,
    /// L2 Euclidean distance. Similarity is `1 / (1 + d)`.
    Euclidean,
    /// Dot product (inner product). Similarity is the raw dot product.
    DotProduct,
}

impl DistanceMetric {
    /// Map a raw distance reported by the index to a similarity score
    /// where larger always means closer.
    #[inline]
    pub fn similarity(&self, distance: f32) -> f32 {
        match self {
            Self::Cosine => 1.0 - distance,
            Self::Euclidean => 1.0 / (1.0 + distance),
            Self::DotProduct => -distance,
        }
    }
}

/// HNSW graph construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max connections per node per layer.
    pub m: usize,
    /// Candidate list size during construction.
    pub ef_construction: usize,
    /// Candidate list size during search (raised to the fetch size when
    /// a query asks for more).
    pub ef_search: usize,
    /// Maximum number of layers in the graph.
    pub max_layer: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            max_layer: 16,
        }
    }
}

/// Embedding dimension per modality.
///
/// Each modality owns a separate index space, so dimensions may differ.
/// A query without a modality filter searches every space whose dimension
/// matches the query vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalityDimensions {
    pub chat: usize,
    pub audio: usize,
    pub video: usize,
}

impl ModalityDimensions {
    /// Dimension configured for the given modality.
    #[inline]
    pub fn get(&self, modality: Modality) -> usize {
        match modality {
            Modality::Chat => self.chat,
            Modality::Audio => self.audio,
            Modality::Video => self.video,
        }
    }

    /// Whether any modality is configured with the given dimension.
    pub fn matches(&self, dimension: usize) -> bool {
        Modality::ALL.iter().any(|m| self.get(*m) == dimension)
    }

    /// Uniform dimensions across all modalities.
    pub fn uniform(dimension: usize) -> Self {
        Self {
            chat: dimension,
            audio: dimension,
            video: dimension,
        }
    }
}

impl Default for ModalityDimensions {
    fn default() -> Self {
        Self {
            chat: 384,
            audio: 512,
            video: 512,
        }
    }
}

/// Configuration for a `SegmentCache` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard limit on live entries in the store.
    pub max_entries: usize,
    /// When `true` (the default), ingestion over capacity evicts the
    /// least-recently-used segment. When `false`, ingestion over capacity
    /// fails with `CapacityExceeded`.
    pub evict_on_capacity: bool,
    /// Embedding dimension per modality.
    pub dimensions: ModalityDimensions,
    /// Distance metric shared by all index spaces.
    pub metric: DistanceMetric,
    /// TTL applied to segments ingested without an explicit one.
    pub default_ttl: Option<Duration>,
    /// Tombstone ratio above which an index space is rebuilt.
    pub compaction_threshold: f32,
    /// Maximum entries examined for expiry per sweep invocation.
    pub sweep_batch_limit: usize,
    /// Attempts at repairing a detected index inconsistency before it is
    /// surfaced as fatal.
    pub reconcile_retry_limit: usize,
    /// Cap on per-query over-fetch added to compensate for tombstones.
    pub search_headroom: usize,
    /// HNSW construction parameters.
    pub hnsw: HnswParams,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            evict_on_capacity: true,
            dimensions: ModalityDimensions::default(),
            metric: DistanceMetric::Cosine,
            default_ttl: None,
            compaction_threshold: 0.2,
            sweep_batch_limit: 256,
            reconcile_retry_limit: 3,
            search_headroom: 64,
            hnsw: HnswParams::default(),
        }
    }
}

impl CacheConfig {
    /// Validate the configuration before wiring a cache instance.
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config("max_entries must be positive".into()));
        }
        for modality in Modality::ALL {
            if self.dimensions.get(modality) == 0 {
                return Err(CacheError::Config(format!(
                    "embedding dimension for {modality} must be positive"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.compaction_threshold) || self.compaction_threshold == 0.0 {
            return Err(CacheError::Config(format!(
                "compaction_threshold must be in (0, 1], got {}",
                self.compaction_threshold
            )));
        }
        if self.sweep_batch_limit == 0 {
            return Err(CacheError::Config("sweep_batch_limit must be positive".into()));
        }
        if self.reconcile_retry_limit == 0 {
            return Err(CacheError::Config(
                "reconcile_retry_limit must be positive".into(),
            ));
        }
        if self.hnsw.m == 0 || self.hnsw.ef_construction == 0 || self.hnsw.ef_search == 0 {
            return Err(CacheError::Config("hnsw parameters must be positive".into()));
        }
        Ok(())
    }

    /// Capacity hint handed to HNSW graph construction.
    pub(crate) fn index_capacity_hint(&self) -> usize {
        self.max_entries.saturating_mul(2).clamp(1_024, 1_000_000)
    }
}
