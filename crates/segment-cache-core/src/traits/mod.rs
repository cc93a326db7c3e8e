//! Collaborator traits consumed by the cache.
//!
//! The cache core defines only the call contracts here; implementations
//! live outside the engine (a storage crate, an embedding service binding,
//! or the test stubs in [`crate::stubs`]).

mod embedding_provider;
mod segment_backend;

pub use embedding_provider::EmbeddingProvider;
pub use segment_backend::SegmentBackend;
