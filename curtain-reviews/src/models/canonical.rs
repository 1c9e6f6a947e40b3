//! Canonical (merged) review

use serde::Serialize;
use std::collections::BTreeSet;

use super::ReviewRecord;

/// One deduplicated review per (show, outlet, critic)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalReview {
    pub outlet_id: String,
    pub critic_id: String,
    /// Merged field values
    pub record: ReviewRecord,
    /// Indices of the merged sightings in the input slice, in arrival order
    #[serde(skip)]
    pub members: Vec<usize>,
}

impl CanonicalReview {
    pub fn show_id(&self) -> &str {
        &self.record.show_id
    }

    /// (showId, outletId, criticId)
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.record.show_id, &self.outlet_id, &self.critic_id)
    }

    pub fn provenance(&self) -> BTreeSet<String> {
        self.record.provenance()
    }

    /// No full text from any source
    pub fn needs_text(&self) -> bool {
        !self.record.has_full_text()
    }

    /// No trustworthy score yet
    pub fn needs_scoring(&self) -> bool {
        self.record.assigned_score.is_none() || self.record.score_source.is_none()
    }
}
