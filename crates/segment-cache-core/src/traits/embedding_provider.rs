//! Embedding provider trait for content-to-vector conversion.
//!
//! The cache calls the provider only when a draft arrives without an
//! embedding; whether embedding computation is local, remote, or absent
//! entirely is the collaborator's business. No model ships with the core.
//!
//! Errors propagate immediately: a failed embedding call fails the
//! ingestion, never silently substitutes a vector.

use crate::error::CacheResult;
use crate::types::{Modality, SegmentContent};

/// Converts segment content into a fixed-length embedding vector.
///
/// Implementations must be thread-safe: ingestion may call `embed` from
/// multiple threads concurrently. Calls are synchronous and expected to
/// be bounded; a provider wrapping an async client should block at its
/// own boundary.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for the given content.
    ///
    /// The content variant carries the modality; the returned vector must
    /// have exactly the dimension reported by
    /// [`dimension`](Self::dimension) for that modality. The pipeline
    /// re-checks and rejects mismatches.
    ///
    /// # Errors
    ///
    /// `CacheError::Embedding` if generation fails.
    fn embed(&self, content: &SegmentContent) -> CacheResult<Vec<f32>>;

    /// Output dimension for the given modality.
    fn dimension(&self, modality: Modality) -> usize;
}
