//! Bounded in-memory cache of multimodal context segments with
//! approximate nearest-neighbor retrieval.
//!
//! Segments (chat turns, audio clips, video scenes) are stored alongside
//! their embeddings and retrieved by vector similarity for RAG context
//! assembly. The cache keeps its keyed store and its embedding index
//! consistent through a fixed write ordering, evicts by TTL and LRU
//! under a hard capacity bound, and exposes atomic hit/miss statistics.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use segment_cache_core::{
//!     CacheConfig, ModalityDimensions, RagQuery, SegmentCache, SegmentContent,
//!     SegmentDraft, StubEmbeddingProvider,
//! };
//!
//! # fn main() -> segment_cache_core::CacheResult<()> {
//! let config = CacheConfig {
//!     dimensions: ModalityDimensions::uniform(4),
//!     ..CacheConfig::default()
//! };
//! let cache = SegmentCache::builder(config.clone())
//!     .with_embedder(Arc::new(StubEmbeddingProvider::new(config.dimensions)))
//!     .build()?;
//!
//! let draft = SegmentDraft::new(SegmentContent::chat("the sky is blue"))
//!     .with_metadata("user_id", "u1")
//!     .with_metadata("session_id", "s1");
//! let id = cache.ingest(draft)?;
//!
//! let segment = cache.get(&id)?;
//! let results = cache.search(&RagQuery::new(segment.embedding.clone(), 1))?;
//! assert_eq!(results.ids(), vec![id]);
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod error;
mod eviction;
mod index;
mod ingest;
mod retrieval;
mod stats;
mod store;
mod stubs;
mod traits;
mod types;

pub use cache::{CacheHealth, SegmentCache, SegmentCacheBuilder};
pub use config::{CacheConfig, DistanceMetric, HnswParams, ModalityDimensions};
pub use error::{CacheError, CacheResult, IndexError, StoreError};
pub use stats::StatsSnapshot;
pub use store::MemoryBackend;
pub use stubs::StubEmbeddingProvider;
pub use traits::{EmbeddingProvider, SegmentBackend};
pub use types::{
    Modality, ModalityProfile, RagQuery, RagResult, ScoredSegment, Segment, SegmentContent,
    SegmentDraft,
};
