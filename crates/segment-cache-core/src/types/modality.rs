//! Modality discriminator and the per-modality capability table.
//!
//! Modality-specific behavior (required metadata, validation) is driven by
//! a small static table rather than per-modality wrapper types, so each
//! profile can be tested in isolation and adding a modality touches one
//! place.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content kind of a cached segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Chat,
    Audio,
    Video,
}

impl Modality {
    /// All supported modalities, in declaration order.
    pub const ALL: [Modality; 3] = [Modality::Chat, Modality::Audio, Modality::Video];

    /// Capability profile for this modality.
    pub fn profile(&self) -> &'static ModalityProfile {
        match self {
            Modality::Chat => &CHAT_PROFILE,
            Modality::Audio => &AUDIO_PROFILE,
            Modality::Video => &VIDEO_PROFILE,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// Static capabilities of one modality.
///
/// `required_metadata` lists the keys ingestion validation demands in the
/// segment metadata map. Chat segments must name the conversation they
/// belong to; audio and video carry everything in their content variant.
#[derive(Debug)]
pub struct ModalityProfile {
    /// Lowercase display name.
    pub name: &'static str,
    /// Metadata keys that must be present at ingestion.
    pub required_metadata: &'static [&'static str],
}

static CHAT_PROFILE: ModalityProfile = ModalityProfile {
    name: "chat",
    required_metadata: &["user_id", "session_id"],
};

static AUDIO_PROFILE: ModalityProfile = ModalityProfile {
    name: "audio",
    required_metadata: &[],
};

static VIDEO_PROFILE: ModalityProfile = ModalityProfile {
    name: "video",
    required_metadata: &[],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_profile_name() {
        assert_eq!(Modality::Chat.to_string(), "chat");
        assert_eq!(Modality::Audio.to_string(), "audio");
        assert_eq!(Modality::Video.to_string(), "video");
    }

    #[test]
    fn chat_requires_conversation_keys() {
        let profile = Modality::Chat.profile();
        assert!(profile.required_metadata.contains(&"user_id"));
        assert!(profile.required_metadata.contains(&"session_id"));
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&Modality::Video).unwrap();
        assert_eq!(json, "\"video\"");
        let back: Modality = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Modality::Video);
    }
}
