//! One HNSW index space: a single modality's vectors at a fixed dimension.
//!
//! The underlying graph cannot cheaply delete points, so removal is a
//! tombstone: the id↔data_id mappings and the stored vector are dropped,
//! the point stays in the graph, and search filters it out because its
//! data_id no longer maps to a live id. When the tombstone ratio grows
//! past the configured threshold the space is rebuilt from the live
//! vectors and the tombstone set cleared.

use std::collections::{HashMap, HashSet};

use hnsw_rs::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DistanceMetric, HnswParams};
use crate::error::IndexError;
use crate::types::Modality;

/// The concrete graph, one variant per supported metric.
enum GraphKind {
    Cosine(Hnsw<'static, f32, DistCosine>),
    Euclidean(Hnsw<'static, f32, DistL2>),
    DotProduct(Hnsw<'static, f32, DistDot>),
}

impl GraphKind {
    fn build(metric: DistanceMetric, params: &HnswParams, capacity: usize) -> Self {
        match metric {
            DistanceMetric::Cosine => Self::Cosine(Hnsw::<f32, DistCosine>::new(
                params.m,
                capacity,
                params.max_layer,
                params.ef_construction,
                DistCosine {},
            )),
            DistanceMetric::Euclidean => Self::Euclidean(Hnsw::<f32, DistL2>::new(
                params.m,
                capacity,
                params.max_layer,
                params.ef_construction,
                DistL2 {},
            )),
            DistanceMetric::DotProduct => Self::DotProduct(Hnsw::<f32, DistDot>::new(
                params.m,
                capacity,
                params.max_layer,
                params.ef_construction,
                DistDot {},
            )),
        }
    }

    fn insert(&self, vector: &[f32], data_id: usize) {
        match self {
            Self::Cosine(graph) => graph.insert_slice((vector, data_id)),
            Self::Euclidean(graph) => graph.insert_slice((vector, data_id)),
            Self::DotProduct(graph) => graph.insert_slice((vector, data_id)),
        }
    }

    fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<Neighbour> {
        match self {
            Self::Cosine(graph) => graph.search(query, k, ef),
            Self::Euclidean(graph) => graph.search(query, k, ef),
            Self::DotProduct(graph) => graph.search(query, k, ef),
        }
    }

    fn point_count(&self) -> usize {
        match self {
            Self::Cosine(graph) => graph.get_nb_point(),
            Self::Euclidean(graph) => graph.get_nb_point(),
            Self::DotProduct(graph) => graph.get_nb_point(),
        }
    }
}

/// Index space for one modality.
///
/// Not internally synchronized; [`EmbeddingIndex`](super::EmbeddingIndex)
/// wraps each space in a lock so searches observe a consistent pre- or
/// post-mutation snapshot.
pub(super) struct IndexSpace {
    modality: Modality,
    dimension: usize,
    metric: DistanceMetric,
    params: HnswParams,
    capacity_hint: usize,
    /// Over-fetch cap compensating for tombstone filtering.
    headroom: usize,
    graph: GraphKind,
    id_to_data: HashMap<Uuid, usize>,
    data_to_id: HashMap<usize, Uuid>,
    /// Live vectors, kept for compaction rebuilds and snapshots.
    vectors: HashMap<Uuid, Vec<f32>>,
    tombstones: HashSet<Uuid>,
    /// Graph points superseded by a re-insert or a revival; they stay in
    /// the graph until compaction and count toward its dead share.
    phantom_points: usize,
    next_data_id: usize,
}

impl std::fmt::Debug for IndexSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSpace")
            .field("modality", &self.modality)
            .field("dimension", &self.dimension)
            .field("metric", &self.metric)
            .field("live", &self.id_to_data.len())
            .field("tombstones", &self.tombstones.len())
            .field("phantom_points", &self.phantom_points)
            .finish()
    }
}

impl IndexSpace {
    pub(super) fn new(
        modality: Modality,
        dimension: usize,
        metric: DistanceMetric,
        params: HnswParams,
        capacity_hint: usize,
        headroom: usize,
    ) -> Self {
        debug!(
            "creating {} index space: dim={}, metric={:?}, m={}, ef_construction={}",
            modality, dimension, metric, params.m, params.ef_construction
        );
        Self {
            modality,
            dimension,
            metric,
            params,
            capacity_hint,
            headroom,
            graph: GraphKind::build(metric, &params, capacity_hint),
            id_to_data: HashMap::new(),
            data_to_id: HashMap::new(),
            vectors: HashMap::new(),
            tombstones: HashSet::new(),
            phantom_points: 0,
            next_data_id: 0,
        }
    }

    pub(super) fn modality(&self) -> Modality {
        self.modality
    }

    pub(super) fn dimension(&self) -> usize {
        self.dimension
    }

    pub(super) fn live_len(&self) -> usize {
        self.id_to_data.len()
    }

    pub(super) fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    pub(super) fn contains(&self, id: &Uuid) -> bool {
        self.id_to_data.contains_key(id)
    }

    pub(super) fn live_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.id_to_data.keys().copied()
    }

    pub(super) fn live_vectors(&self) -> impl Iterator<Item = (Uuid, &Vec<f32>)> + '_ {
        self.vectors.iter().map(|(id, vector)| (*id, vector))
    }

    pub(super) fn tombstoned_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.tombstones.iter().copied()
    }

    pub(super) fn restore_tombstones(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.tombstones.extend(ids);
    }

    /// Insert a vector, reviving a tombstoned id if necessary.
    ///
    /// Re-inserting a live id is idempotent in effect: the id keeps its
    /// data_id and the freshly inserted point shadows the old one at
    /// query time (both resolve to the same id, deduplicated by search).
    pub(super) fn insert(&mut self, id: Uuid, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                modality: self.modality,
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            return Err(IndexError::ZeroNormVector(id));
        }

        if self.tombstones.remove(&id) {
            // The dead point stays in the graph; account for it until
            // compaction drops it.
            self.phantom_points += 1;
            debug!("reviving tombstoned id {} in {} space", id, self.modality);
        }

        let data_id = match self.id_to_data.get(&id) {
            Some(&existing) => {
                self.phantom_points += 1;
                debug!("re-inserting vector for live id {} (data_id={})", id, existing);
                existing
            }
            None => {
                let fresh = self.next_data_id;
                self.next_data_id += 1;
                self.id_to_data.insert(id, fresh);
                self.data_to_id.insert(fresh, id);
                fresh
            }
        };

        self.graph.insert(vector, data_id);
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    /// Search for the `k` nearest live ids.
    ///
    /// Over-fetches by the current tombstone count (capped by the
    /// configured headroom) so that tombstone filtering still yields `k`
    /// live candidates when enough exist.
    pub(super) fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Uuid, f32)>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                modality: self.modality,
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.id_to_data.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let fetch = k.saturating_add(self.tombstones.len().min(self.headroom));
        let ef = self.params.ef_search.max(fetch);
        let neighbours = self.graph.search(query, fetch, ef);

        // A live id can surface more than once when its vector was
        // re-inserted; keep the best score per id.
        let mut best: HashMap<Uuid, f32> = HashMap::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let Some(&id) = self.data_to_id.get(&neighbour.d_id) else {
                // Tombstoned or unmapped point.
                continue;
            };
            let score = self.metric.similarity(neighbour.distance);
            best.entry(id)
                .and_modify(|current| {
                    if score > *current {
                        *current = score;
                    }
                })
                .or_insert(score);
        }

        let mut results: Vec<(Uuid, f32)> = best.into_iter().collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    /// Tombstone a live id. Returns whether it was live.
    pub(super) fn remove(&mut self, id: &Uuid) -> bool {
        match self.id_to_data.remove(id) {
            Some(data_id) => {
                self.data_to_id.remove(&data_id);
                self.vectors.remove(id);
                self.tombstones.insert(*id);
                debug!(
                    "tombstoned id {} in {} space (vector stays in graph until compaction)",
                    id, self.modality
                );
                true
            }
            None => false,
        }
    }

    /// Fraction of graph points that are logically dead, counting both
    /// tombstones and points superseded by re-inserts.
    pub(super) fn tombstone_ratio(&self) -> f32 {
        let dead = self.tombstones.len() + self.phantom_points;
        let total = self.id_to_data.len() + dead;
        if total == 0 {
            return 0.0;
        }
        dead as f32 / total as f32
    }

    /// Rebuild the graph from the live vectors and clear tombstones.
    ///
    /// Cost is proportional to the live entry count. The caller holds the
    /// space's write lock, so searches see either the old or the new
    /// graph, never a partial rebuild.
    pub(super) fn compact(&mut self) -> Result<(), IndexError> {
        let live = self.vectors.len();
        let dropped = self.tombstones.len() + self.phantom_points;
        let graph = GraphKind::build(self.metric, &self.params, self.capacity_hint.max(live));

        let mut id_to_data = HashMap::with_capacity(live);
        let mut data_to_id = HashMap::with_capacity(live);
        for (data_id, (id, vector)) in self.vectors.iter().enumerate() {
            graph.insert(vector, data_id);
            id_to_data.insert(*id, data_id);
            data_to_id.insert(data_id, *id);
        }

        self.graph = graph;
        self.id_to_data = id_to_data;
        self.data_to_id = data_to_id;
        self.next_data_id = live;
        self.tombstones.clear();
        self.phantom_points = 0;

        info!(
            "compacted {} index space: {} live vectors retained, {} dead points dropped",
            self.modality, live, dropped
        );
        Ok(())
    }

    /// Points physically present in the graph, dead or alive.
    #[allow(dead_code)]
    pub(super) fn point_count(&self) -> usize {
        self.graph.point_count()
    }
}
