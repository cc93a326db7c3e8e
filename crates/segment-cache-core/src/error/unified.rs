//! Unified error type for the segment cache.

use thiserror::Error;
use uuid::Uuid;

use super::sub_errors::{IndexError, StoreError};

/// Unified error type covering every cache operation.
///
/// Input problems (`Validation`, `NotFound`, `CapacityExceeded`) surface
/// immediately to the caller. Internal consistency problems are repaired
/// automatically with a bounded retry budget and only reach the caller as
/// `IndexInconsistency` once that budget is exhausted. A transport layer
/// mapping these to status codes owns that mapping entirely.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Malformed or incomplete input, rejected before any write.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown id on exact lookup.
    #[error("segment not found: {0}")]
    NotFound(Uuid),

    /// Index write failed after the store write; the store write was
    /// rolled back, so retrying is safe.
    #[error("ingestion failed for segment {id}: {reason}")]
    IngestionFailed {
        /// Canonical id the segment would have had.
        id: Uuid,
        /// Why the index write failed.
        reason: String,
    },

    /// The store is at its hard limit and eviction is disabled.
    #[error("capacity exceeded: store is at its hard limit of {capacity} entries")]
    CapacityExceeded {
        /// Configured entry limit.
        capacity: usize,
    },

    /// Cross-structure invariant violated and reconciliation retries
    /// were exhausted.
    #[error("index inconsistency: {0}")]
    IndexInconsistency(String),

    /// A caller-supplied deadline elapsed.
    ///
    /// Similarity search never returns this; it converts the condition
    /// into a degraded partial result. The variant exists for callers
    /// driving the lower-level components directly.
    #[error("deadline exceeded after {waited_ms}ms")]
    DeadlineExceeded {
        /// Milliseconds spent before giving up.
        waited_ms: u64,
    },

    /// Embedding acquisition failed (absent provider, provider failure,
    /// or provider output with the wrong dimension).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Invalid cache configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Embedding index failure.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Segment store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CacheError {
    /// Whether retrying the failed operation might succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::IngestionFailed { .. } | Self::DeadlineExceeded { .. }
        )
    }

    /// Whether this error indicates a system health problem that needs
    /// investigation rather than caller correction.
    #[inline]
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::IndexInconsistency(_) | Self::Store(StoreError::Corruption(_))
        )
    }

    /// Convenience constructor for validation errors.
    #[inline]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
