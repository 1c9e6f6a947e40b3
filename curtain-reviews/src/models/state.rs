//! Review lifecycle
//!
//! `Unresolved → Flagged { reason } → Deleted`. The on-disk flag fields
//! (`wrongShow`, `wrongProduction`, `duplicateOf`, `isRoundupArticle`) are
//! the memo of earlier decisions; passes only ever move a review forward.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ReviewState {
    Unresolved,
    Flagged { reason: String },
    Deleted,
}

impl ReviewState {
    /// Whether moving from `self` to `next` goes forward
    pub fn can_transition_to(&self, next: &ReviewState) -> bool {
        matches!(
            (self, next),
            (ReviewState::Unresolved, ReviewState::Flagged { .. })
                | (ReviewState::Flagged { .. }, ReviewState::Deleted)
        )
    }
}
