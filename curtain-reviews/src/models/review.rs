//! On-disk review record
//!
//! One JSON file per review sighting. The same shape is used for the
//! merged canonical review, so a consolidated record can be written back
//! over its primary sighting file. Fields this crate does not know about
//! are kept in `extra` and written back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::state::ReviewState;
use super::Confidence;

/// Method that produced `assignedScore`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreSource {
    /// High-confidence externally computed score (ensemble/LLM)
    External,
    /// Letter grade or star rating found in the record
    ExplicitRating,
    /// Aggregator thumb (Up/Meh/Flat/Down)
    Thumb,
    /// Editorial designation such as "Critics' Pick"
    Designation,
    /// Lexicon sentiment over the review text
    Sentiment,
}

impl ScoreSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::ExplicitRating => "explicit-rating",
            Self::Thumb => "thumb",
            Self::Designation => "designation",
            Self::Sentiment => "sentiment",
        }
    }
}

/// Scoring status for reviews the cascade could not score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreStatus {
    ToBeCalculated,
}

/// Externally computed score attached by an upstream collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleScore {
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub needs_review: bool,
}

/// A URL that a resolution pass removed, kept so the change can be reverted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRemoval {
    pub url: String,
    pub reason: String,
}

/// Review sighting / canonical review as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRecord {
    #[serde(default)]
    pub show_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,

    // Source-specific excerpts are independent fields, not alternatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtli_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bww_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_score_excerpt: Option<String>,

    // Raw rating signals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtli_thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bww_thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble_score: Option<EnsembleScore>,

    // Score cascade output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_source: Option<ScoreSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_status: Option<ScoreStatus>,

    // Provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    // Resolution flags
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrong_show: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrong_show_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrong_show_owner: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub wrong_production: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrong_production_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_roundup_article: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_removed: Option<UrlRemoval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage_text_reason: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ReviewRecord {
    /// Current lifecycle state derived from on-disk flags
    pub fn state(&self) -> ReviewState {
        if self.wrong_show {
            return ReviewState::Flagged {
                reason: self
                    .wrong_show_reason
                    .clone()
                    .unwrap_or_else(|| "wrong show".to_string()),
            };
        }
        if self.wrong_production {
            return ReviewState::Flagged {
                reason: self
                    .wrong_production_reason
                    .clone()
                    .unwrap_or_else(|| "wrong production".to_string()),
            };
        }
        if let Some(primary) = &self.duplicate_of {
            return ReviewState::Flagged {
                reason: format!("duplicate of {}", primary),
            };
        }
        if self.is_roundup_article {
            return ReviewState::Flagged {
                reason: "roundup article".to_string(),
            };
        }
        ReviewState::Unresolved
    }

    /// True when no earlier pass has flagged this review
    pub fn is_active(&self) -> bool {
        self.state() == ReviewState::Unresolved
    }

    /// Source-specific excerpts in fixed order (DTLI, BWW, Show-Score)
    pub fn excerpts(&self) -> impl Iterator<Item = &str> {
        [&self.dtli_excerpt, &self.bww_excerpt, &self.show_score_excerpt]
            .into_iter()
            .filter_map(|e| e.as_deref())
            .filter(|e| !e.trim().is_empty())
    }

    /// Full text if present and non-blank
    pub fn text(&self) -> Option<&str> {
        self.full_text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn has_full_text(&self) -> bool {
        self.text().is_some()
    }

    /// Union of `source` and `sources`, sorted
    pub fn provenance(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .chain(self.source.iter())
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Flag as belonging to another show; returns false if already flagged
    pub fn flag_wrong_show(&mut self, reason: &str, owner: Option<&str>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.wrong_show = true;
        self.wrong_show_reason = Some(reason.to_string());
        self.wrong_show_owner = owner.map(str::to_string);
        true
    }

    /// Flag as reviewing a different production; returns false if already flagged
    pub fn flag_wrong_production(&mut self, reason: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        self.wrong_production = true;
        self.wrong_production_reason = Some(reason.to_string());
        true
    }

    /// Mark as a duplicate of another review file; returns false if already flagged
    pub fn mark_duplicate_of(&mut self, primary: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        self.duplicate_of = Some(primary.to_string());
        true
    }

    /// Null the URL, remembering the old value; returns false if there was none
    pub fn null_url(&mut self, reason: &str) -> bool {
        let Some(url) = self.url.take() else {
            return false;
        };
        self.url_removed = Some(UrlRemoval {
            url,
            reason: reason.to_string(),
        });
        true
    }
}
