//! Core domain types: segments, modalities, queries and results.

mod modality;
mod query;
mod segment;

pub use modality::{Modality, ModalityProfile};
pub use query::{RagQuery, RagResult, ScoredSegment};
pub use segment::{Segment, SegmentContent, SegmentDraft};
