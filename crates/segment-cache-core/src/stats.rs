//! Contention-light cache statistics.
//!
//! Plain relaxed atomics: recording never takes a lock, snapshots never
//! block writers, and counters are eventually consistent with respect to
//! in-flight operations. That is enough for monitoring; nothing in the
//! engine makes decisions off these numbers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Modality;

/// Passive counters observed by every cache path.
#[derive(Debug, Default)]
pub struct StatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    ingests: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
    compactions: AtomicU64,
    chat_hits: AtomicU64,
    audio_hits: AtomicU64,
    video_hits: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self, modality: Modality) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        let per_modality = match modality {
            Modality::Chat => &self.chat_hits,
            Modality::Audio => &self.audio_hits,
            Modality::Video => &self.video_hits,
        };
        per_modality.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ingest(&self) {
        self.ingests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_compactions(&self, count: u64) {
        self.compactions.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ingests: self.ingests.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            compactions: self.compactions.load(Ordering::Relaxed),
            chat_hits: self.chat_hits.load(Ordering::Relaxed),
            audio_hits: self.audio_hits.load(Ordering::Relaxed),
            video_hits: self.video_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Lookups and searches that returned at least one segment.
    pub hits: u64,
    /// Lookups and searches that returned nothing.
    pub misses: u64,
    /// Successful ingestions.
    pub ingests: u64,
    /// Segments removed under capacity pressure.
    pub evictions: u64,
    /// Segments removed by TTL expiry.
    pub expired: u64,
    /// Index space rebuilds.
    pub compactions: u64,
    /// Hits that returned chat segments.
    pub chat_hits: u64,
    /// Hits that returned audio segments.
    pub audio_hits: u64,
    /// Hits that returned video segments.
    pub video_hits: u64,
}

impl StatsSnapshot {
    /// Total lookups observed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
