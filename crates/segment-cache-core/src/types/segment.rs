//! The `Segment` record, its tagged content variants, and ingestion drafts.
//!
//! A segment's canonical id is derived from its content via UUID v5, so
//! ingesting identical content twice always yields the same id and the
//! store upserts instead of duplicating.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Modality;

/// Namespace for content-derived segment ids.
const SEGMENT_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_39f4_5a0e_42c7_9c88_d41e_0b73_a2f5);

/// Content payload of a segment, tagged by modality.
///
/// The variant *is* the modality discriminator; [`SegmentContent::modality`]
/// derives it. Binary media is referenced by source string (URI or object
/// key), not embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modality", rename_all = "snake_case")]
pub enum SegmentContent {
    /// One chat turn.
    Chat { text: String },
    /// An audio clip reference with its sample rate and optional transcript.
    Audio {
        source: String,
        sample_rate_hz: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    /// A video clip reference with an optional caption.
    Video {
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl SegmentContent {
    /// Convenience constructor for a chat turn.
    pub fn chat(text: impl Into<String>) -> Self {
        Self::Chat { text: text.into() }
    }

    /// Convenience constructor for an audio clip.
    pub fn audio(source: impl Into<String>, sample_rate_hz: u32) -> Self {
        Self::Audio {
            source: source.into(),
            sample_rate_hz,
            transcript: None,
        }
    }

    /// Convenience constructor for a video clip.
    pub fn video(source: impl Into<String>) -> Self {
        Self::Video {
            source: source.into(),
            caption: None,
        }
    }

    /// The modality this content belongs to.
    pub fn modality(&self) -> Modality {
        match self {
            Self::Chat { .. } => Modality::Chat,
            Self::Audio { .. } => Modality::Audio,
            Self::Video { .. } => Modality::Video,
        }
    }

    /// Unambiguous byte encoding used for id derivation and stub
    /// embeddings. Fields are length-prefixed so `("ab", "c")` and
    /// `("a", "bc")` never collide.
    pub(crate) fn canonical_bytes(&self) -> Vec<u8> {
        fn push_field(buf: &mut Vec<u8>, field: &[u8]) {
            buf.extend_from_slice(&(field.len() as u64).to_le_bytes());
            buf.extend_from_slice(field);
        }

        let mut buf = Vec::new();
        match self {
            Self::Chat { text } => {
                buf.push(0);
                push_field(&mut buf, text.as_bytes());
            }
            Self::Audio {
                source,
                sample_rate_hz,
                transcript,
            } => {
                buf.push(1);
                push_field(&mut buf, source.as_bytes());
                push_field(&mut buf, &sample_rate_hz.to_le_bytes());
                push_field(&mut buf, transcript.as_deref().unwrap_or("").as_bytes());
            }
            Self::Video { source, caption } => {
                buf.push(2);
                push_field(&mut buf, source.as_bytes());
                push_field(&mut buf, caption.as_deref().unwrap_or("").as_bytes());
            }
        }
        buf
    }
}

/// One cached unit: content, embedding, metadata and access bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Content-derived canonical id (UUID v5).
    pub id: Uuid,
    /// Tagged content payload.
    pub content: SegmentContent,
    /// Free-form metadata; modality profiles require certain keys.
    #[serde(with = "metadata_codec")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Embedding vector, dimension fixed per modality.
    pub embedding: Vec<f32>,
    /// Creation time; TTL counts from here.
    pub created_at: DateTime<Utc>,
    /// Last successful hydration time; drives LRU eviction.
    pub last_accessed_at: DateTime<Utc>,
    /// Successful hydration count.
    pub access_count: u64,
    /// Time-to-live; `None` means the segment never expires.
    pub ttl: Option<Duration>,
}

impl Segment {
    /// Derive the canonical id for a piece of content.
    pub fn canonical_id(content: &SegmentContent) -> Uuid {
        Uuid::new_v5(&SEGMENT_NAMESPACE, &content.canonical_bytes())
    }

    /// The modality of this segment.
    #[inline]
    pub fn modality(&self) -> Modality {
        self.content.modality()
    }

    /// Whether the TTL has elapsed as of `now`.
    ///
    /// A TTL too large to represent never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.created_at.checked_add_signed(ttl))
        {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    /// Record a successful hydration.
    pub fn mark_accessed(&mut self, when: DateTime<Utc>) {
        self.last_accessed_at = when;
        self.access_count += 1;
    }
}

/// Serde codec for the metadata map.
///
/// `serde_json::Value` deserializes via `deserialize_any`, which binary
/// codecs like bincode reject. Encoding each value as a JSON string keeps
/// segments round-trippable through the snapshot format.
mod metadata_codec {
    use std::collections::HashMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &HashMap<String, serde_json::Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut encoded: Vec<(&String, String)> =
            map.iter().map(|(k, v)| (k, v.to_string())).collect();
        encoded.sort_by(|a, b| a.0.cmp(b.0));
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, serde_json::Value>, D::Error> {
        let encoded = Vec::<(String, String)>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                serde_json::from_str(&v)
                    .map(|value| (k, value))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

/// Input to ingestion: content plus optional metadata, embedding and TTL.
///
/// When no embedding is supplied the pipeline asks the configured
/// `EmbeddingProvider` for one.
#[derive(Debug, Clone)]
pub struct SegmentDraft {
    pub content: SegmentContent,
    pub metadata: HashMap<String, serde_json::Value>,
    pub embedding: Option<Vec<f32>>,
    pub ttl: Option<Duration>,
}

impl SegmentDraft {
    pub fn new(content: SegmentContent) -> Self {
        Self {
            content,
            metadata: HashMap::new(),
            embedding: None,
            ttl: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_id_is_deterministic() {
        let a = Segment::canonical_id(&SegmentContent::chat("hello"));
        let b = Segment::canonical_id(&SegmentContent::chat("hello"));
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_differs_per_content() {
        let a = Segment::canonical_id(&SegmentContent::chat("hello"));
        let b = Segment::canonical_id(&SegmentContent::chat("hello!"));
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_id_differs_per_modality() {
        let chat = Segment::canonical_id(&SegmentContent::chat("clip.wav"));
        let audio = Segment::canonical_id(&SegmentContent::audio("clip.wav", 16_000));
        assert_ne!(chat, audio);
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let a = SegmentContent::Video {
            source: "ab".into(),
            caption: Some("c".into()),
        };
        let b = SegmentContent::Video {
            source: "a".into(),
            caption: Some("bc".into()),
        };
        assert_ne!(Segment::canonical_id(&a), Segment::canonical_id(&b));
    }

    #[test]
    fn ttl_expiry() {
        let now = Utc::now();
        let segment = Segment {
            id: Segment::canonical_id(&SegmentContent::chat("x")),
            content: SegmentContent::chat("x"),
            metadata: HashMap::new(),
            embedding: vec![1.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: Some(Duration::from_millis(10)),
        };
        assert!(!segment.is_expired(now));
        assert!(segment.is_expired(now + chrono::Duration::milliseconds(11)));
    }

    #[test]
    fn no_ttl_never_expires() {
        let now = Utc::now();
        let segment = Segment {
            id: Segment::canonical_id(&SegmentContent::chat("y")),
            content: SegmentContent::chat("y"),
            metadata: HashMap::new(),
            embedding: vec![1.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        };
        assert!(!segment.is_expired(now + chrono::Duration::days(365)));
    }

    #[test]
    fn metadata_survives_binary_round_trip() {
        let now = Utc::now();
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), serde_json::json!("u1"));
        metadata.insert("turn".to_string(), serde_json::json!(7));
        metadata.insert("tags".to_string(), serde_json::json!(["a", "b"]));
        let segment = Segment {
            id: Segment::canonical_id(&SegmentContent::chat("w")),
            content: SegmentContent::chat("w"),
            metadata,
            embedding: vec![1.0, 2.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 3,
            ttl: Some(Duration::from_secs(60)),
        };

        let bytes = bincode::serialize(&segment).unwrap();
        let back: Segment = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, segment);
        assert_eq!(back.metadata.get("turn").unwrap(), 7);
    }

    #[test]
    fn mark_accessed_bumps_counters() {
        let now = Utc::now();
        let mut segment = Segment {
            id: Segment::canonical_id(&SegmentContent::chat("z")),
            content: SegmentContent::chat("z"),
            metadata: HashMap::new(),
            embedding: vec![1.0],
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl: None,
        };
        let later = now + chrono::Duration::seconds(5);
        segment.mark_accessed(later);
        assert_eq!(segment.access_count, 1);
        assert_eq!(segment.last_accessed_at, later);
    }
}
