//! Data model shared by every pass

pub mod canonical;
pub mod review;
pub mod show;
pub mod state;

pub use canonical::CanonicalReview;
pub use review::{EnsembleScore, ReviewRecord, ScoreSource, ScoreStatus, UrlRemoval};
pub use show::{strip_year_suffix, Credit, Show, ShowRegistry};
pub use state::ReviewState;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence attached to a resolution or score decision
///
/// Ordered: `Low < Medium < High < Certain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
    Certain,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
            Confidence::Certain => "certain",
        };
        f.write_str(s)
    }
}
