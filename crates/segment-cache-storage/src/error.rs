//! File-backend error types.
//!
//! Errors carry the path and a descriptive message for fail-fast
//! debugging, and convert into the core store error so the engine never
//! sees backend-specific types.

use segment_cache_core::StoreError;
use thiserror::Error;

/// Failures of the file-backed segment store.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// The snapshot file could not be opened or created.
    #[error("failed to open segment file '{path}': {message}")]
    OpenFailed {
        /// Path where the open was attempted.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Writing the snapshot file failed.
    #[error("write to '{path}' failed: {message}")]
    WriteFailed {
        /// Path being written.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Encoding or decoding segment data failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The segment file exists but its contents are not readable.
    #[error("segment file '{path}' is corrupt: {details}")]
    Corrupt {
        /// Path of the unreadable file.
        path: String,
        /// What failed while reading it.
        details: String,
    },
}

impl From<FileStoreError> for StoreError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::Corrupt { .. } => StoreError::Corruption(err.to_string()),
            FileStoreError::Serialization(message) => StoreError::Serialization(message),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_maps_to_core_corruption() {
        let err = FileStoreError::Corrupt {
            path: "/tmp/segments.bin".into(),
            details: "truncated".into(),
        };
        assert!(matches!(StoreError::from(err), StoreError::Corruption(_)));
    }

    #[test]
    fn open_failure_maps_to_backend_error() {
        let err = FileStoreError::OpenFailed {
            path: "/missing".into(),
            message: "no such file".into(),
        };
        let core = StoreError::from(err);
        assert!(matches!(core, StoreError::Backend(_)));
        assert!(core.to_string().contains("/missing"));
    }
}
