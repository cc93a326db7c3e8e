//! File-backed segment storage.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use segment_cache_core::{Segment, SegmentBackend, StoreError};

use crate::error::FileStoreError;

/// Durable [`SegmentBackend`] over a single snapshot file.
///
/// The working set lives in a sharded in-process map; `flush` serializes
/// it to a sibling temp file and renames it over the snapshot, so the
/// file on disk is always a complete snapshot, never a torn write.
/// Writes between flushes are not durable. Dropping the backend flushes
/// on a best-effort basis; call `flush` explicitly where durability
/// matters.
///
/// # Thread Safety
///
/// Operations on independent ids never contend. `flush` iterates the map
/// concurrently with writers and captures some interleaving of them,
/// which is the same guarantee every point-in-time snapshot has.
#[derive(Debug)]
pub struct FileBackend {
    data: DashMap<Uuid, Segment>,
    path: PathBuf,
}

impl FileBackend {
    /// Open a file-backed store, loading the snapshot at `path` if one
    /// exists. A missing file starts an empty store; the file appears on
    /// the first flush.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let path = path.into();
        let data = DashMap::new();

        if path.exists() {
            let bytes = fs::read(&path).map_err(|e| FileStoreError::OpenFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            let segments: Vec<Segment> =
                bincode::deserialize(&bytes).map_err(|e| FileStoreError::Corrupt {
                    path: path.display().to_string(),
                    details: e.to_string(),
                })?;
            info!(
                "loaded {} segments from {}",
                segments.len(),
                path.display()
            );
            for segment in segments {
                data.insert(segment.id, segment);
            }
        }

        Ok(Self { data, path })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self) -> Result<(), FileStoreError> {
        let segments: Vec<Segment> = self
            .data
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let bytes = bincode::serialize(&segments)
            .map_err(|e| FileStoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        let io_failed = |e: std::io::Error| FileStoreError::WriteFailed {
            path: self.path.display().to_string(),
            message: e.to_string(),
        };
        fs::write(&tmp, bytes).map_err(io_failed)?;
        fs::rename(&tmp, &self.path).map_err(io_failed)?;
        Ok(())
    }
}

impl SegmentBackend for FileBackend {
    fn put(&self, segment: Segment) -> Result<(), StoreError> {
        self.data.insert(segment.id, segment);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Result<Option<Segment>, StoreError> {
        Ok(self.data.get(id).map(|entry| entry.value().clone()))
    }

    fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.data.remove(id).is_some())
    }

    fn exists(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.data.contains_key(id))
    }

    fn touch(&self, id: &Uuid, when: DateTime<Utc>) -> Result<bool, StoreError> {
        match self.data.get_mut(id) {
            Some(mut entry) => {
                entry.value_mut().mark_accessed(when);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn ids(&self) -> Vec<Uuid> {
        self.data.iter().map(|entry| *entry.key()).collect()
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.write_snapshot()?;
        Ok(())
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if let Err(e) = self.write_snapshot() {
            warn!("final flush of {} failed: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use segment_cache_core::SegmentContent;

    use super::*;

    fn segment(text: &str) -> Segment {
        let content = SegmentContent::chat(text);
        let now = Utc::now();
        Segment {
            id: Segment::canonical_id(&content),
            content,
            metadata: HashMap::new(),
            embedding: vec![1.0, 0.0, 0.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        }
    }

    #[test]
    fn flush_then_reopen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.bin");

        let backend = FileBackend::open(&path).unwrap();
        let a = segment("alpha");
        let b = segment("beta");
        let (id_a, id_b) = (a.id, b.id);
        backend.put(a).unwrap();
        backend.put(b).unwrap();
        backend.flush().unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.exists(&id_a).unwrap());
        let got = reopened.get(&id_b).unwrap().unwrap();
        assert_eq!(got.content, SegmentContent::chat("beta"));
    }

    #[test]
    fn drop_flushes_unsaved_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.bin");

        {
            let backend = FileBackend::open(&path).unwrap();
            backend.put(segment("unsaved")).unwrap();
        }

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn deletes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.bin");

        let backend = FileBackend::open(&path).unwrap();
        let keep = segment("keep");
        let gone = segment("gone");
        let (keep_id, gone_id) = (keep.id, gone.id);
        backend.put(keep).unwrap();
        backend.put(gone).unwrap();
        backend.flush().unwrap();
        assert!(backend.delete(&gone_id).unwrap());
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert!(reopened.exists(&keep_id).unwrap());
        assert!(!reopened.exists(&gone_id).unwrap());
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.bin");
        fs::write(&path, b"garbage").unwrap();

        let err = FileBackend::open(&path).unwrap_err();
        assert!(matches!(err, FileStoreError::Corrupt { .. }));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("absent.bin")).unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn touch_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("segments.bin")).unwrap();
        let entry = segment("touched");
        let id = entry.id;
        backend.put(entry).unwrap();

        assert!(backend.touch(&id, Utc::now()).unwrap());
        let got = backend.get(&id).unwrap().unwrap();
        assert_eq!(got.access_count, 1);
        assert!(!backend.touch(&Uuid::new_v4(), Utc::now()).unwrap());
    }
}
