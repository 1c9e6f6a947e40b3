//! Score assignment cascade
//!
//! Rules are tried in priority order and the first one that produces a
//! score wins. There is no default rule: a review no rule can score is
//! marked "to be calculated" and left without a number.

pub mod rating;
pub mod sentiment;

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::ResolverThresholds;
use crate::models::{Confidence, ReviewRecord, ScoreSource, ScoreStatus};

/// Designation phrases treated as an editorial pick
const PICK_DESIGNATIONS: &[&str] = &["critics' pick", "critic's pick", "critics pick", "critic pick"];
const PICK_SCORE: u8 = 90;

/// A score produced by one rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub source: ScoreSource,
    pub confidence: Confidence,
    pub evidence: String,
}

/// One step of the cascade
pub trait ScoreRule: Send + Sync {
    fn source(&self) -> ScoreSource;

    /// Score the review, or `None` to defer to the next rule
    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult>;
}

/// Text a rule may read: full text, else the excerpts joined
fn available_text(record: &ReviewRecord) -> Option<String> {
    if let Some(text) = record.text() {
        return Some(text.to_string());
    }
    let excerpts: Vec<&str> = record.excerpts().collect();
    (!excerpts.is_empty()).then(|| excerpts.join("\n"))
}

/// 1. Externally computed (ensemble) score that is not flagged for review
pub struct ExternalScoreRule;

impl ScoreRule for ExternalScoreRule {
    fn source(&self) -> ScoreSource {
        ScoreSource::External
    }

    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        let ensemble = record.ensemble_score.as_ref()?;
        let level = ensemble.confidence.as_deref().map(str::to_lowercase);
        if ensemble.needs_review || level.as_deref() == Some("low") || !ensemble.score.is_finite() {
            return None;
        }

        let confidence = match level.as_deref() {
            Some("high") => Confidence::High,
            _ => Confidence::Medium,
        };
        Some(ScoreResult {
            score: ensemble.score.round().clamp(1.0, 100.0) as u8,
            source: self.source(),
            confidence,
            evidence: format!("ensemble score {:.1}", ensemble.score),
        })
    }
}

/// 2. Letter grade or star rating, from the rating field or the end of the text
pub struct ExplicitRatingRule {
    pub tail_chars: usize,
}

impl ScoreRule for ExplicitRatingRule {
    fn source(&self) -> ScoreSource {
        ScoreSource::ExplicitRating
    }

    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        let from_field = record
            .original_rating
            .as_deref()
            .and_then(rating::parse_rating_field);
        let (score, evidence) = match from_field {
            Some(found) => found,
            None => {
                let text = available_text(record)?;
                rating::parse_text_tail(&text, self.tail_chars)?
            }
        };
        Some(ScoreResult {
            score,
            source: self.source(),
            confidence: Confidence::High,
            evidence,
        })
    }
}

/// 3. Aggregator thumb, DTLI before BWW
pub struct ThumbRule;

impl ThumbRule {
    fn thumb_score(thumb: &str) -> Option<u8> {
        match thumb.trim().to_lowercase().as_str() {
            "up" => Some(85),
            "meh" | "flat" => Some(60),
            "down" => Some(30),
            _ => None,
        }
    }
}

impl ScoreRule for ThumbRule {
    fn source(&self) -> ScoreSource {
        ScoreSource::Thumb
    }

    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        [("DTLI", &record.dtli_thumb), ("BWW", &record.bww_thumb)]
            .into_iter()
            .find_map(|(label, thumb)| {
                let thumb = thumb.as_deref()?;
                Self::thumb_score(thumb).map(|score| ScoreResult {
                    score,
                    source: ScoreSource::Thumb,
                    confidence: Confidence::Medium,
                    evidence: format!("{} thumb {}", label, thumb.trim()),
                })
            })
    }
}

/// 4. Editorial designation such as "Critics' Pick"
pub struct DesignationRule;

impl ScoreRule for DesignationRule {
    fn source(&self) -> ScoreSource {
        ScoreSource::Designation
    }

    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        let designation = record.designation.as_deref()?;
        let normalized = designation.trim().to_lowercase().replace('\u{2019}', "'");
        PICK_DESIGNATIONS.contains(&normalized.as_str()).then(|| ScoreResult {
            score: PICK_SCORE,
            source: self.source(),
            confidence: Confidence::Medium,
            evidence: format!("designation {}", designation.trim()),
        })
    }
}

/// 5. Lexicon sentiment over the review text
pub struct SentimentRule {
    pub min_chars: usize,
}

impl ScoreRule for SentimentRule {
    fn source(&self) -> ScoreSource {
        ScoreSource::Sentiment
    }

    fn score(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        let text = available_text(record)?;
        let result = sentiment::score_text(&text, self.min_chars)?;
        Some(ScoreResult {
            score: result.score,
            source: self.source(),
            confidence: result.confidence,
            evidence: format!(
                "sentiment ratio {:.2} (+{:.1} / -{:.1})",
                result.ratio, result.total_positive, result.total_negative
            ),
        })
    }
}

/// What the cascade decided for one review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ScoreAssessment {
    /// Score from an earlier run, left alone
    Kept { source: ScoreSource },
    Scored(ScoreResult),
    /// No rule applied
    ToBeCalculated,
}

pub struct ScoreCascade {
    rules: Vec<Box<dyn ScoreRule>>,
}

impl ScoreCascade {
    /// Standard rule order with thresholds from config
    pub fn new(thresholds: &ResolverThresholds) -> Self {
        Self::with_rules(vec![
            Box::new(ExternalScoreRule),
            Box::new(ExplicitRatingRule {
                tail_chars: thresholds.grade_tail_chars,
            }),
            Box::new(ThumbRule),
            Box::new(DesignationRule),
            Box::new(SentimentRule {
                min_chars: thresholds.sentiment_min_chars,
            }),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn ScoreRule>>) -> Self {
        Self { rules }
    }

    /// First rule result, ignoring any score already on the record
    pub fn evaluate(&self, record: &ReviewRecord) -> Option<ScoreResult> {
        self.rules.iter().find_map(|rule| rule.score(record))
    }

    /// Whether the record carries a rating of its own
    ///
    /// Sentiment is excluded, as is a score this cascade derived from
    /// sentiment: both are read off the text, not supplied with the review.
    pub fn has_rating_evidence(&self, record: &ReviewRecord) -> bool {
        let native = self
            .rules
            .iter()
            .filter(|rule| rule.source() != ScoreSource::Sentiment)
            .any(|rule| rule.score(record).is_some());
        let recorded = record.assigned_score.is_some()
            && record.score_source.is_some_and(|s| s != ScoreSource::Sentiment);
        native || recorded
    }

    /// Decide the score for a review
    ///
    /// A score with a recorded source is trusted as-is. A bare score
    /// with no source is re-derived and dropped if nothing supports it.
    pub fn assess(&self, record: &ReviewRecord) -> ScoreAssessment {
        if let (Some(_), Some(source)) = (record.assigned_score, record.score_source) {
            return ScoreAssessment::Kept { source };
        }
        match self.evaluate(record) {
            Some(result) => ScoreAssessment::Scored(result),
            None => ScoreAssessment::ToBeCalculated,
        }
    }
}

/// Write an assessment into the record; returns whether anything changed
pub fn apply_assessment(record: &mut ReviewRecord, assessment: &ScoreAssessment) -> bool {
    let before = (
        record.assigned_score,
        record.score_source,
        record.score_confidence,
        record.score_status,
    );
    match assessment {
        ScoreAssessment::Kept { .. } => return false,
        ScoreAssessment::Scored(result) => {
            record.assigned_score = Some(result.score);
            record.score_source = Some(result.source);
            record.score_confidence = Some(result.confidence);
            record.score_status = None;
        }
        ScoreAssessment::ToBeCalculated => {
            record.assigned_score = None;
            record.score_source = None;
            record.score_confidence = None;
            record.score_status = Some(ScoreStatus::ToBeCalculated);
        }
    }
    before
        != (
            record.assigned_score,
            record.score_source,
            record.score_confidence,
            record.score_status,
        )
}

/// Per-source counts for the audit report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub kept: usize,
    pub by_source: BTreeMap<ScoreSource, usize>,
    pub to_be_calculated: usize,
}

impl ScoreBreakdown {
    pub fn record(&mut self, assessment: &ScoreAssessment) {
        match assessment {
            ScoreAssessment::Kept { .. } => self.kept += 1,
            ScoreAssessment::Scored(result) => *self.by_source.entry(result.source).or_default() += 1,
            ScoreAssessment::ToBeCalculated => self.to_be_calculated += 1,
        }
    }

    pub fn log_summary(&self) {
        let by_source: Vec<String> = self
            .by_source
            .iter()
            .map(|(source, count)| format!("{}={}", source.as_str(), count))
            .collect();
        info!(
            "Scores: {} kept, {} newly scored [{}], {} to be calculated",
            self.kept,
            self.by_source.values().sum::<usize>(),
            by_source.join(", "),
            self.to_be_calculated
        );
    }
}

/// Assess a batch of active reviews
pub fn assess_all(cascade: &ScoreCascade, records: &[&ReviewRecord]) -> (Vec<(usize, ScoreAssessment)>, ScoreBreakdown) {
    let mut breakdown = ScoreBreakdown::default();
    let assessments: Vec<(usize, ScoreAssessment)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_active())
        .map(|(i, r)| {
            let assessment = cascade.assess(r);
            if let ScoreAssessment::Scored(result) = &assessment {
                debug!(show = %r.show_id, score = result.score, "{}", result.evidence);
            }
            breakdown.record(&assessment);
            (i, assessment)
        })
        .collect();
    breakdown.log_summary();
    (assessments, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EnsembleScore;

    fn cascade() -> ScoreCascade {
        ScoreCascade::new(&ResolverThresholds::default())
    }

    fn record() -> ReviewRecord {
        ReviewRecord {
            show_id: "cabaret-2024".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_external_score_needs_trustworthy_flag() {
        let mut r = record();
        r.ensemble_score = Some(EnsembleScore {
            score: 78.4,
            confidence: Some("high".to_string()),
            needs_review: false,
        });
        r.dtli_thumb = Some("Down".to_string());
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!((result.source, result.score), (ScoreSource::External, 78));

        r.ensemble_score.as_mut().unwrap().needs_review = true;
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!((result.source, result.score), (ScoreSource::Thumb, 30));

        r.ensemble_score = Some(EnsembleScore {
            score: 90.0,
            confidence: Some("LOW".to_string()),
            needs_review: false,
        });
        assert_eq!(cascade().evaluate(&r).unwrap().source, ScoreSource::Thumb);
    }

    #[test]
    fn test_rating_beats_thumb() {
        let mut r = record();
        r.original_rating = Some("B-".to_string());
        r.dtli_thumb = Some("Up".to_string());
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!((result.source, result.score), (ScoreSource::ExplicitRating, 80));
    }

    #[test]
    fn test_dtli_thumb_preferred_over_bww() {
        let mut r = record();
        r.dtli_thumb = Some("Meh".to_string());
        r.bww_thumb = Some("Up".to_string());
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!(result.score, 60);
        assert!(result.evidence.starts_with("DTLI"));

        r.dtli_thumb = Some("sideways".to_string());
        assert_eq!(cascade().evaluate(&r).unwrap().score, 85);
    }

    #[test]
    fn test_designation_scores_pick() {
        let mut r = record();
        r.designation = Some("Critic\u{2019}s Pick".to_string());
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!((result.source, result.score), (ScoreSource::Designation, 90));
    }

    #[test]
    fn test_sentiment_is_last_resort() {
        let mut r = record();
        r.full_text = Some("A stunning, electrifying production with a superb cast.".to_string());
        let result = cascade().evaluate(&r).unwrap();
        assert_eq!(result.source, ScoreSource::Sentiment);
        assert_eq!(result.score, 88);
    }

    #[test]
    fn test_no_rule_means_to_be_calculated_never_fifty() {
        let mut r = record();
        r.full_text = Some("Runs two hours.".to_string());
        let assessment = cascade().assess(&r);
        assert_eq!(assessment, ScoreAssessment::ToBeCalculated);

        assert!(apply_assessment(&mut r, &assessment));
        assert_eq!(r.assigned_score, None);
        assert_eq!(r.score_status, Some(ScoreStatus::ToBeCalculated));
        assert!(!apply_assessment(&mut r, &assessment));
    }

    #[test]
    fn test_existing_scores_are_kept() {
        let mut r = record();
        r.assigned_score = Some(71);
        r.score_source = Some(ScoreSource::Sentiment);
        r.dtli_thumb = Some("Up".to_string());
        let assessment = cascade().assess(&r);
        assert_eq!(assessment, ScoreAssessment::Kept { source: ScoreSource::Sentiment });
        assert!(!apply_assessment(&mut r, &assessment));
        assert_eq!(r.assigned_score, Some(71));
    }

    #[test]
    fn test_sentiment_score_is_not_rating_evidence() {
        let mut r = record();
        r.bww_excerpt = Some("A stunning, electrifying production with a superb cast.".to_string());
        assert!(!cascade().has_rating_evidence(&r));

        let assessment = cascade().assess(&r);
        assert!(apply_assessment(&mut r, &assessment));
        assert_eq!(r.score_source, Some(ScoreSource::Sentiment));
        assert!(!cascade().has_rating_evidence(&r));

        let mut picked = record();
        picked.designation = Some("Critics' Pick".to_string());
        assert!(cascade().has_rating_evidence(&picked));

        let mut imported = record();
        imported.assigned_score = Some(74);
        imported.score_source = Some(ScoreSource::External);
        assert!(cascade().has_rating_evidence(&imported));

        let mut bare = record();
        bare.assigned_score = Some(50);
        assert!(!cascade().has_rating_evidence(&bare));
    }

    #[test]
    fn test_orphan_score_is_rederived() {
        let mut r = record();
        r.assigned_score = Some(50);
        r.bww_thumb = Some("Down".to_string());
        let assessment = cascade().assess(&r);
        assert!(apply_assessment(&mut r, &assessment));
        assert_eq!(r.assigned_score, Some(30));
        assert_eq!(r.score_source, Some(ScoreSource::Thumb));

        let mut bare = record();
        bare.assigned_score = Some(50);
        let assessment = cascade().assess(&bare);
        apply_assessment(&mut bare, &assessment);
        assert_eq!(bare.assigned_score, None);
    }

    #[test]
    fn test_breakdown_counts() {
        let mut scored = record();
        scored.dtli_thumb = Some("Up".to_string());
        let mut kept = record();
        kept.assigned_score = Some(80);
        kept.score_source = Some(ScoreSource::Thumb);
        let mut flagged = record();
        flagged.wrong_show = true;
        let empty = record();

        let records = [&scored, &kept, &flagged, &empty];
        let (assessments, breakdown) = assess_all(&cascade(), &records);
        assert_eq!(assessments.len(), 3);
        assert_eq!(breakdown.kept, 1);
        assert_eq!(breakdown.by_source.get(&ScoreSource::Thumb), Some(&1));
        assert_eq!(breakdown.to_be_calculated, 1);
    }
}
