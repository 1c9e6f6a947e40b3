//! Configuration for curtain-reviews
//!
//! Every tuned constant the passes rely on lives in [`ResolverThresholds`]
//! so it can be adjusted from the `[thresholds]` table of the TOML config
//! without touching the algorithms. Missing keys use compiled defaults.
//!
//! ```toml
//! root_folder = "/srv/curtain"
//!
//! [logging]
//! level = "debug"
//!
//! [thresholds]
//! date_proximity_days = 45
//!
//! [collision]
//! min_apply_confidence = "high"
//! ```

use curtain_common::config::{locate_config_file, read_toml_file, LoggingConfig};
use curtain_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::Confidence;

/// Tuned thresholds for merge, resolution, verification and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverThresholds {
    /// Excerpt similarity to merge when one side has no known critic
    pub unknown_critic_excerpt_similarity: f64,
    /// Excerpt similarity to merge two same-outlet sightings
    pub excerpt_similarity: f64,
    /// Full-text prefix similarity to merge two same-outlet sightings
    pub full_text_prefix_similarity: f64,
    /// Characters of full text compared for the prefix test
    pub full_text_prefix_chars: usize,
    /// Characters of an excerpt compared (bounds edit-distance cost)
    pub excerpt_compare_chars: usize,
    /// Edit-distance ratio above which two critic names match
    pub name_similarity: f64,

    /// Distinct shows sharing a URL before it is treated as a generic link
    pub generic_url_min_shows: usize,
    /// Publish-to-opening distance that counts as "near" the opening
    pub date_proximity_days: i64,
    /// Opening dates this close mark two productions as a double bill
    pub double_bill_days: i64,

    /// Preview allowance before opening for the date-mismatch check
    pub preview_window_months: u32,
    /// Characters either side of a wrong indicator scanned for suppression phrases
    pub context_window_chars: usize,
    /// Unsuppressed wrong indicators needed to flag a review
    pub default_min_wrong_indicators: usize,

    /// Text shorter than this is never sentiment-scored
    pub sentiment_min_chars: usize,
    /// Trailing characters scanned for "Grade:"/"Rating:" patterns
    pub grade_tail_chars: usize,

    /// Text longer than this is never treated as an error page
    pub garbage_max_chars: usize,
    /// Text shorter than this is checked for navigation boilerplate
    pub boilerplate_max_chars: usize,
}

impl Default for ResolverThresholds {
    fn default() -> Self {
        Self {
            unknown_critic_excerpt_similarity: 0.5,
            excerpt_similarity: 0.7,
            full_text_prefix_similarity: 0.8,
            full_text_prefix_chars: 500,
            excerpt_compare_chars: 300,
            name_similarity: 0.85,
            generic_url_min_shows: 5,
            date_proximity_days: 60,
            double_bill_days: 14,
            preview_window_months: 6,
            context_window_chars: 150,
            default_min_wrong_indicators: 2,
            sentiment_min_chars: 30,
            grade_tail_chars: 12,
            garbage_max_chars: 1500,
            boilerplate_max_chars: 200,
        }
    }
}

/// Which collision decisions are allowed to mutate the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionPolicy {
    /// Winner/loser decisions below this confidence stay advisory
    pub min_apply_confidence: Confidence,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self {
            min_apply_confidence: Confidence::High,
        }
    }
}

/// Top-level TOML config
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CurtainConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub thresholds: ResolverThresholds,
    pub collision: CollisionPolicy,
    /// Reference tables file; defaults to `<root>/tables.toml` when present
    pub tables_path: Option<PathBuf>,
}

impl CurtainConfig {
    /// Load from an explicit path, `CURTAIN_CONFIG`, or the user config dir
    ///
    /// No config file at all means compiled defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let Some(path) = locate_config_file(cli_path) else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        match read_toml_file::<CurtainConfig>(&path)? {
            Some(config) => {
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }
}
