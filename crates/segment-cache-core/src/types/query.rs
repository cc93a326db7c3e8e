//! Similarity query and result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Modality, Segment};

/// A similarity query against the cache.
///
/// # Example
///
/// ```
/// use segment_cache_core::{Modality, RagQuery};
///
/// let query = RagQuery::new(vec![0.1, 0.2, 0.3], 5)
///     .with_modality(Modality::Chat)
///     .with_min_score(0.8);
/// assert_eq!(query.k, 5);
/// assert_eq!(query.modality, Some(Modality::Chat));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RagQuery {
    /// Query embedding. Must match the dimension of at least one
    /// configured modality (exactly the filtered one, if set).
    pub embedding: Vec<f32>,
    /// Maximum number of results.
    pub k: usize,
    /// Restrict results to one modality.
    pub modality: Option<Modality>,
    /// Drop candidates scoring below this threshold.
    pub min_score: Option<f32>,
    /// Best-effort deadline; on expiry the partial result collected so
    /// far is returned flagged as degraded.
    pub deadline: Option<Duration>,
}

impl RagQuery {
    pub fn new(embedding: Vec<f32>, k: usize) -> Self {
        Self {
            embedding,
            k,
            modality: None,
            min_score: None,
            deadline: None,
        }
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = Some(modality);
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// One search hit: the hydrated segment and its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub score: f32,
}

/// Ordered, one-shot result set of a similarity query.
///
/// Hits are sorted by descending score, ties broken by most recent
/// access. `degraded` is set when a deadline cut hydration short; a
/// degraded result is still a successful result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagResult {
    pub hits: Vec<ScoredSegment>,
    pub degraded: bool,
}

impl RagResult {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Ids of the returned segments, in rank order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.hits.iter().map(|hit| hit.segment.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_sets_fields() {
        let query = RagQuery::new(vec![1.0], 3)
            .with_min_score(0.5)
            .with_deadline(Duration::from_millis(20));
        assert_eq!(query.min_score, Some(0.5));
        assert_eq!(query.deadline, Some(Duration::from_millis(20)));
        assert_eq!(query.modality, None);
    }

    #[test]
    fn empty_result_is_not_degraded() {
        let result = RagResult::empty();
        assert!(result.is_empty());
        assert!(!result.degraded);
        assert!(result.ids().is_empty());
    }
}
