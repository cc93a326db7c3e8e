//! Durable storage backends for the segment cache.
//!
//! The cache core works against the [`SegmentBackend`] trait and ships a
//! memory-resident default; this crate adds a file-backed implementation
//! for deployments that need segments to survive a restart.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use segment_cache_core::{CacheConfig, ModalityDimensions, SegmentCache};
//! use segment_cache_storage::FileBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let backend = FileBackend::open(dir.path().join("segments.bin"))?;
//! let cache = SegmentCache::builder(CacheConfig {
//!     dimensions: ModalityDimensions::uniform(4),
//!     ..CacheConfig::default()
//! })
//! .with_backend(Arc::new(backend))
//! .build()?;
//! assert!(cache.is_empty());
//! # Ok(())
//! # }
//! ```

mod error;
mod file_backend;

pub use error::FileStoreError;
pub use file_backend::FileBackend;

pub use segment_cache_core::SegmentBackend;
