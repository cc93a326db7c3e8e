//! Approximate nearest-neighbor index over segment embeddings.
//!
//! One [`IndexSpace`] per modality, since dimensions differ across
//! modalities. Each space sits behind its own `RwLock`: structural
//! mutation (insert, tombstone, compaction) takes the write lock, queries
//! take the read lock, so a query always observes a consistent pre- or
//! post-mutation snapshot. That lock is the index's only broad critical
//! section; compaction work is proportional to the live entries of one
//! space, never the whole cache.

mod space;

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::IndexError;
use crate::types::Modality;

use space::IndexSpace;

/// Serialized form of one index space: enough to rebuild the graph
/// without re-embedding anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub modality: Modality,
    pub dimension: usize,
    pub vectors: Vec<(Uuid, Vec<f32>)>,
    pub tombstones: Vec<Uuid>,
}

/// Multi-space embedding index with tombstoned deletion.
#[derive(Debug)]
pub struct EmbeddingIndex {
    /// One space per modality, in `Modality::ALL` order.
    spaces: [RwLock<IndexSpace>; 3],
    compaction_threshold: f32,
}

impl EmbeddingIndex {
    /// Build one empty space per modality from the cache configuration.
    pub(crate) fn new(config: &CacheConfig) -> Self {
        let build = |modality: Modality| {
            RwLock::new(IndexSpace::new(
                modality,
                config.dimensions.get(modality),
                config.metric,
                config.hnsw,
                config.index_capacity_hint(),
                config.search_headroom,
            ))
        };
        Self {
            spaces: [
                build(Modality::Chat),
                build(Modality::Audio),
                build(Modality::Video),
            ],
            compaction_threshold: config.compaction_threshold,
        }
    }

    fn space(&self, modality: Modality) -> &RwLock<IndexSpace> {
        match modality {
            Modality::Chat => &self.spaces[0],
            Modality::Audio => &self.spaces[1],
            Modality::Video => &self.spaces[2],
        }
    }

    /// Insert a vector for a segment into its modality's space.
    pub(crate) fn insert(
        &self,
        id: Uuid,
        modality: Modality,
        vector: &[f32],
    ) -> Result<(), IndexError> {
        self.space(modality).write().insert(id, vector)
    }

    /// Query for the `k` nearest live ids.
    ///
    /// With a modality filter, only that space is searched and the query
    /// dimension must match it. Without one, every space whose dimension
    /// equals the query's is searched and the merged candidates are
    /// re-ranked by score.
    pub(crate) fn search(
        &self,
        modality: Option<Modality>,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<(Uuid, f32)>, IndexError> {
        match modality {
            Some(modality) => self.space(modality).read().search(query, k),
            None => {
                let mut merged = Vec::new();
                let mut searched = 0usize;
                for space in self.spaces.iter() {
                    let space = space.read();
                    if space.dimension() != query.len() {
                        continue;
                    }
                    searched += 1;
                    merged.extend(space.search(query, k)?);
                }
                if searched == 0 {
                    return Err(IndexError::SearchFailed {
                        k,
                        message: format!(
                            "no index space matches query dimension {}",
                            query.len()
                        ),
                    });
                }
                merged.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
                });
                merged.truncate(k);
                Ok(merged)
            }
        }
    }

    /// Tombstone an id wherever it is live. Returns whether it was live.
    pub(crate) fn remove(&self, id: &Uuid) -> bool {
        for space in self.spaces.iter() {
            if space.write().remove(id) {
                return true;
            }
        }
        false
    }

    /// Whether the id is live in any space.
    pub(crate) fn contains(&self, id: &Uuid) -> bool {
        self.spaces
            .iter()
            .any(|space| space.read().contains(id))
    }

    /// Live entries across all spaces.
    pub(crate) fn live_len(&self) -> usize {
        self.spaces
            .iter()
            .map(|space| space.read().live_len())
            .sum()
    }

    /// Tombstones across all spaces.
    pub(crate) fn tombstone_count(&self) -> usize {
        self.spaces
            .iter()
            .map(|space| space.read().tombstone_count())
            .sum()
    }

    /// All live ids across spaces.
    pub(crate) fn live_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for space in self.spaces.iter() {
            ids.extend(space.read().live_ids());
        }
        ids
    }

    /// Compact every space whose tombstone ratio exceeds the configured
    /// threshold. Returns the number of spaces rebuilt.
    pub(crate) fn compact_if_needed(&self) -> Result<usize, IndexError> {
        let mut compacted = 0;
        for space in self.spaces.iter() {
            let needs = space.read().tombstone_ratio() > self.compaction_threshold;
            if needs {
                let mut space = space.write();
                // Re-check under the write lock; a concurrent compaction
                // may have run between the two acquisitions.
                if space.tombstone_ratio() > self.compaction_threshold {
                    space.compact()?;
                    compacted += 1;
                }
            }
        }
        Ok(compacted)
    }

    /// Serialize every space for persistence.
    pub(crate) fn snapshot(&self) -> Vec<SpaceSnapshot> {
        self.spaces
            .iter()
            .map(|space| {
                let space = space.read();
                SpaceSnapshot {
                    modality: space.modality(),
                    dimension: space.dimension(),
                    vectors: space
                        .live_vectors()
                        .map(|(id, vector)| (id, vector.clone()))
                        .collect(),
                    tombstones: space.tombstoned_ids().collect(),
                }
            })
            .collect()
    }

    /// Rebuild spaces from a snapshot, keeping only vectors whose ids are
    /// in `live`. Ids missing from `live` would dangle, so they are
    /// skipped with a warning rather than restored.
    pub(crate) fn restore(
        &self,
        snapshots: &[SpaceSnapshot],
        live: &HashSet<Uuid>,
    ) -> Result<(), IndexError> {
        for snap in snapshots {
            let mut space = self.space(snap.modality).write();
            if space.dimension() != snap.dimension {
                warn!(
                    "skipping snapshot for {} space: snapshot dimension {} != configured {}",
                    snap.modality,
                    snap.dimension,
                    space.dimension()
                );
                continue;
            }
            for (id, vector) in &snap.vectors {
                if !live.contains(id) {
                    warn!(
                        "skipping snapshot vector {} in {} space: no matching segment",
                        id, snap.modality
                    );
                    continue;
                }
                space.insert(*id, vector)?;
            }
            space.restore_tombstones(snap.tombstones.iter().copied());
        }
        Ok(())
    }
}
