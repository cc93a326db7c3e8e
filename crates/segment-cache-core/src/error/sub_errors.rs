//! Sub-error types, one enum per failure domain.

use thiserror::Error;
use uuid::Uuid;

use crate::types::Modality;

// ============================================================================
// INDEX ERROR
// ============================================================================

/// Failures inside the embedding index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Vector dimension does not match the space it targets.
    #[error("dimension mismatch for {modality}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Modality whose index space was addressed.
        modality: Modality,
        /// Dimension configured for that space.
        expected: usize,
        /// Dimension actually supplied.
        actual: usize,
    },

    /// Zero-norm vectors cannot be indexed under cosine similarity.
    #[error("zero-norm embedding for segment {0}")]
    ZeroNormVector(Uuid),

    /// Insertion into the graph failed.
    #[error("insertion failed for segment {id}: {message}")]
    InsertionFailed {
        /// Segment whose vector was being inserted.
        id: Uuid,
        /// Detail from the underlying structure.
        message: String,
    },

    /// Search against the graph failed.
    #[error("search failed (k={k}): {message}")]
    SearchFailed {
        /// Requested neighbor count.
        k: usize,
        /// Detail from the underlying structure.
        message: String,
    },
}

// ============================================================================
// STORE ERROR
// ============================================================================

/// Failures inside the segment store or its backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed an operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// Encoding or decoding of a stored segment failed.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// I/O failure in a file-backed store.
    #[error("store I/O error while {context}: {source}")]
    Io {
        /// What the store was doing.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Stored data failed an integrity check.
    #[error("store corruption detected: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
