//! Deterministic stand-ins for external services, used by tests and by
//! callers that want a cache without a real embedding model behind it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::ModalityDimensions;
use crate::error::CacheResult;
use crate::traits::EmbeddingProvider;
use crate::types::{Modality, SegmentContent};

/// Hash-seeded pseudo-embedding provider.
///
/// The vector is a pure function of the segment content, so repeated
/// ingestion of the same content embeds identically and similarity
/// scores are stable across runs. The vectors carry no semantic meaning.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dimensions: ModalityDimensions,
}

impl StubEmbeddingProvider {
    pub fn new(dimensions: ModalityDimensions) -> Self {
        Self { dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(ModalityDimensions::default())
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, content: &SegmentContent) -> CacheResult<Vec<f32>> {
        let mut hasher = DefaultHasher::new();
        content.canonical_bytes().hash(&mut hasher);
        let dimension = self.dimension(content.modality());
        Ok(pseudo_vector(hasher.finish(), dimension))
    }

    fn dimension(&self, modality: Modality) -> usize {
        self.dimensions.get(modality)
    }
}

/// Expand a 64-bit seed into a unit-norm vector with an LCG.
fn pseudo_vector(seed: u64, dimension: usize) -> Vec<f32> {
    let mut state = seed;
    let mut vector = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // Top bits have the best mixing; map into [-1, 1).
        let unit = ((state >> 40) as f32) / ((1u64 << 23) as f32);
        vector.push(unit * 2.0 - 1.0);
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut vector {
            *x /= norm;
        }
    } else {
        vector[0] = 1.0;
    }
    vector
}
