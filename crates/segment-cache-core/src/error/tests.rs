//! Error display, conversion and classification tests.

use uuid::Uuid;

use super::*;
use crate::types::Modality;

#[test]
fn validation_display() {
    let err = CacheError::validation("missing user_id");
    assert_eq!(err.to_string(), "validation error: missing user_id");
}

#[test]
fn not_found_carries_id() {
    let id = Uuid::new_v4();
    let err = CacheError::NotFound(id);
    assert!(err.to_string().contains(&id.to_string()));
}

#[test]
fn index_error_converts_to_unified() {
    let inner = IndexError::DimensionMismatch {
        modality: Modality::Chat,
        expected: 384,
        actual: 12,
    };
    let err: CacheError = inner.into();
    match err {
        CacheError::Index(IndexError::DimensionMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 384);
            assert_eq!(actual, 12);
        }
        other => panic!("unexpected variant: {other:?}"),
    }
}

#[test]
fn store_error_converts_to_unified() {
    let err: CacheError = StoreError::Backend("disk full".into()).into();
    assert!(matches!(err, CacheError::Store(_)));
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn recoverable_classification() {
    let retryable = CacheError::IngestionFailed {
        id: Uuid::new_v4(),
        reason: "index write failed".into(),
    };
    assert!(retryable.is_recoverable());
    assert!(CacheError::DeadlineExceeded { waited_ms: 50 }.is_recoverable());
    assert!(!CacheError::validation("bad input").is_recoverable());
}

#[test]
fn critical_classification() {
    assert!(CacheError::IndexInconsistency("dangling entries".into()).is_critical());
    assert!(CacheError::Store(StoreError::Corruption("bad record".into())).is_critical());
    assert!(!CacheError::NotFound(Uuid::new_v4()).is_critical());
    assert!(!CacheError::CapacityExceeded { capacity: 2 }.is_critical());
}

#[test]
fn io_error_keeps_source() {
    use std::error::Error as _;
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err = StoreError::io("opening snapshot", io);
    assert!(err.source().is_some());
    assert!(err.to_string().contains("opening snapshot"));
}
