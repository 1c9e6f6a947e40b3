//! Wrong-production content verifier
//!
//! Catches reviews of an earlier production of a revived title that were
//! filed under the current revival. Two independent signals:
//! - wrong-production indicators (earlier venue, cast, year) in the text,
//!   ignoring mentions framed as stage history
//! - a publish date (or URL year) well before this production existed
//!
//! Only shows recognised as revivals are checked.

use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::ResolverThresholds;
use crate::models::{Confidence, ReviewRecord, Show, ShowRegistry};
use crate::tables::{ProductionIndicators, ReferenceTables};

use curtain_common::dates::{months_before, parse_optional_date, year_from_url};

/// Phrases that mark a mention as stage history rather than this production
const HISTORY_PHRASES: &[&str] = &[
    "moved to",
    "moved from",
    "transferred from",
    "transferred to",
    "transfer from",
    "originally",
    "in the original",
    "original cast",
    "original production",
    "original broadway",
    "won the tony",
    "tony-winning turn",
    "previously",
    "portrayed by",
    "created the role",
    "last revival",
    "previous revival",
    "earlier revival",
];

static BRACKETED_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]\s*(?:19|20)\d{2}\s*[\)\]]").expect("static regex"));

/// How a flagged review should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Date mismatch, or no marker of this production at all; auto-applied
    LikelyWrongProduction,
    /// Several markers of this production; a correct review with a history aside
    ComparisonMentions,
    /// Ambiguous
    NeedsReview,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LikelyWrongProduction => "likely_wrong_production",
            Self::ComparisonMentions => "comparison_mentions",
            Self::NeedsReview => "needs_review",
        }
    }
}

/// A wrong-production indicator mention discarded as stage history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressedHit {
    pub indicator: String,
    pub phrase: String,
}

/// Outcome of scanning one text against a production's indicators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorScan {
    /// Distinct wrong indicators with at least one unsuppressed mention
    pub wrong_hits: Vec<String>,
    pub suppressed: Vec<SuppressedHit>,
    /// Distinct expected indicators mentioned anywhere
    pub expected_hits: Vec<String>,
}

/// One review judged to possibly cover another production
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionFinding {
    /// Index in the verified slice
    #[serde(skip)]
    pub index: usize,
    pub show_id: String,
    pub outlet: Option<String>,
    pub critic_name: Option<String>,
    pub classification: Classification,
    pub confidence: Confidence,
    pub date_mismatch: Option<String>,
    #[serde(flatten)]
    pub scan: IndicatorScan,
    pub reason: String,
}

impl ProductionFinding {
    /// Only likely-wrong findings ever mutate the store
    pub fn is_applicable(&self) -> bool {
        self.classification == Classification::LikelyWrongProduction
    }
}

pub struct ProductionVerifier<'a> {
    tables: &'a ReferenceTables,
    thresholds: &'a ResolverThresholds,
}

impl<'a> ProductionVerifier<'a> {
    pub fn new(tables: &'a ReferenceTables, thresholds: &'a ResolverThresholds) -> Self {
        Self { tables, thresholds }
    }

    /// Year-suffixed id plus one of: `revival` tag, indicator table entry,
    /// or a base title on the revived-titles list
    pub fn is_revival(&self, show: &Show) -> bool {
        if show.year_suffix().is_none() {
            return false;
        }
        show.has_tag("revival")
            || self.tables.indicators_for(&show.id).is_some()
            || self.tables.revived_titles.contains(show.base_title())
    }

    /// Scan text for expected and wrong indicators
    pub fn scan(&self, text: &str, indicators: &ProductionIndicators) -> IndicatorScan {
        let lowered = text.to_lowercase();
        let mut scan = IndicatorScan::default();

        for indicator in &indicators.wrong {
            let needle = indicator.trim().to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let mut counted = false;
            for (start, matched) in lowered.match_indices(&needle) {
                let context = context_around(&lowered, start, start + matched.len(), self.thresholds.context_window_chars);
                match history_phrase(context) {
                    Some(phrase) => scan.suppressed.push(SuppressedHit {
                        indicator: indicator.clone(),
                        phrase,
                    }),
                    None if !counted => {
                        scan.wrong_hits.push(indicator.clone());
                        counted = true;
                    }
                    None => {}
                }
            }
        }

        scan.expected_hits = indicators
            .expected
            .iter()
            .filter(|e| {
                let needle = e.trim().to_lowercase();
                !needle.is_empty() && lowered.contains(&needle)
            })
            .cloned()
            .collect();

        scan
    }

    /// Publish date (or URL year) too early for this production
    ///
    /// A full date must fall before the earlier of previews and opening,
    /// minus the preview window. Without a date, a URL year earlier than
    /// `openingYear - 1` counts.
    pub fn date_mismatch(&self, record: &ReviewRecord, show: &Show) -> Option<String> {
        let opening = show.opening()?;
        let earliest = match show.previews_start() {
            Some(previews) if previews < opening => previews,
            _ => opening,
        };

        if let Some(published) = parse_optional_date(record.publish_date.as_deref()) {
            let cutoff = months_before(earliest, self.thresholds.preview_window_months);
            return (published < cutoff).then(|| {
                format!(
                    "published {} is before {} ({} months ahead of first performance {})",
                    published, cutoff, self.thresholds.preview_window_months, earliest
                )
            });
        }

        let url_year = record.url.as_deref().and_then(year_from_url)?;
        (url_year < opening.year() - 1).then(|| {
            format!(
                "URL year {} is more than a year before opening {}",
                url_year, opening
            )
        })
    }

    /// Verify one review against its show; `None` when nothing is suspicious
    pub fn verify(&self, index: usize, record: &ReviewRecord, show: &Show) -> Option<ProductionFinding> {
        if !self.is_revival(show) {
            return None;
        }

        let date_mismatch = self.date_mismatch(record, show);
        let indicators = self.tables.indicators_for(&show.id);
        let scan = match (indicators, review_text(record)) {
            (Some(indicators), Some(text)) => self.scan(&text, indicators),
            _ => IndicatorScan::default(),
        };
        let min_wrong = indicators
            .and_then(|i| i.min_wrong_matches)
            .unwrap_or(self.thresholds.default_min_wrong_indicators)
            .max(1);
        let enough_wrong = scan.wrong_hits.len() >= min_wrong;

        if date_mismatch.is_none() && !enough_wrong {
            if !scan.suppressed.is_empty() {
                debug!(
                    show = %show.id,
                    suppressed = scan.suppressed.len(),
                    "Wrong-production mentions suppressed as stage history"
                );
            }
            return None;
        }

        let (classification, confidence) = if date_mismatch.is_some() {
            (Classification::LikelyWrongProduction, Confidence::High)
        } else if scan.expected_hits.is_empty() {
            (Classification::LikelyWrongProduction, Confidence::High)
        } else if scan.expected_hits.len() >= 2 {
            (Classification::ComparisonMentions, Confidence::Low)
        } else {
            (Classification::NeedsReview, Confidence::Medium)
        };

        let mut evidence = Vec::new();
        if let Some(mismatch) = &date_mismatch {
            evidence.push(mismatch.clone());
        }
        if enough_wrong {
            evidence.push(format!(
                "mentions {} ({} of {} needed), {} marker(s) of this production",
                scan.wrong_hits.join(", "),
                scan.wrong_hits.len(),
                min_wrong,
                scan.expected_hits.len()
            ));
        }

        Some(ProductionFinding {
            index,
            show_id: show.id.clone(),
            outlet: record.outlet.clone(),
            critic_name: record.critic_name.clone(),
            classification,
            confidence,
            date_mismatch,
            reason: format!("{}: {}", classification.as_str(), evidence.join("; ")),
            scan,
        })
    }

    /// Verify every active review of a registered revival
    pub fn verify_all(&self, records: &[&ReviewRecord], registry: &ShowRegistry) -> Vec<ProductionFinding> {
        let findings: Vec<ProductionFinding> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active())
            .filter_map(|(i, r)| registry.get(&r.show_id).and_then(|show| self.verify(i, r, show)))
            .collect();

        let mut per_class: BTreeMap<&str, usize> = BTreeMap::new();
        for finding in &findings {
            *per_class.entry(finding.classification.as_str()).or_default() += 1;
        }
        info!("Wrong-production findings: {} total, {:?}", findings.len(), per_class);

        findings
    }
}

/// Set `wrongProduction` for an applicable finding; false if nothing changed
pub fn apply_finding(finding: &ProductionFinding, record: &mut ReviewRecord) -> bool {
    finding.is_applicable() && record.flag_wrong_production(&finding.reason)
}

/// Full text, else the excerpts joined
fn review_text(record: &ReviewRecord) -> Option<String> {
    if let Some(text) = record.text() {
        return Some(text.to_string());
    }
    let excerpts: Vec<&str> = record.excerpts().collect();
    (!excerpts.is_empty()).then(|| excerpts.join("\n"))
}

/// Up to `window` chars either side of `start..end`
fn context_around(text: &str, start: usize, end: usize, window: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

fn history_phrase(context: &str) -> Option<String> {
    if let Some(phrase) = HISTORY_PHRASES.iter().find(|p| context.contains(*p)) {
        return Some((*phrase).to_string());
    }
    BRACKETED_YEAR_RE
        .find(context)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revival(id: &str, opening: &str) -> Show {
        Show {
            id: id.to_string(),
            slug: None,
            title: id.to_string(),
            venue: None,
            opening_date: Some(opening.to_string()),
            previews_start_date: None,
            closing_date: None,
            cast: Vec::new(),
            creative_team: Vec::new(),
            tags: vec!["revival".to_string()],
        }
    }

    fn review(show_id: &str, text: Option<&str>) -> ReviewRecord {
        ReviewRecord {
            show_id: show_id.to_string(),
            outlet: Some("Variety".to_string()),
            full_text: text.map(str::to_string),
            ..Default::default()
        }
    }

    fn fixtures() -> (ReferenceTables, ResolverThresholds) {
        (ReferenceTables::builtin().unwrap(), ResolverThresholds::default())
    }

    #[test]
    fn test_revival_detection() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);

        assert!(verifier.is_revival(&revival("x-2024", "2024-04-01")));

        let mut listed = revival("our-town-2024", "2024-10-17");
        listed.tags.clear();
        assert!(verifier.is_revival(&listed));

        let mut plain = revival("new-musical-2024", "2024-04-01");
        plain.tags.clear();
        assert!(!verifier.is_revival(&plain));

        let mut no_year = revival("hadestown", "2019-04-17");
        no_year.tags = vec!["revival".to_string()];
        assert!(!verifier.is_revival(&no_year));
    }

    #[test]
    fn test_history_mention_is_suppressed() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let indicators = ProductionIndicators {
            expected: vec!["Jim Gaffigan".to_string()],
            wrong: vec!["Paul Newman".to_string()],
            min_wrong_matches: Some(1),
        };

        let text = "The Stage Manager, the role, previously portrayed by Henry Fonda and Paul Newman, \
                    is played here by Jim Gaffigan with a shrug and a grin.";
        let scan = verifier.scan(text, &indicators);
        assert!(scan.wrong_hits.is_empty());
        assert_eq!(scan.suppressed.len(), 1);
        assert_eq!(scan.suppressed[0].indicator, "Paul Newman");
        assert_eq!(scan.expected_hits, vec!["Jim Gaffigan".to_string()]);
    }

    #[test]
    fn test_bracketed_year_suppresses() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let indicators = ProductionIndicators {
            expected: Vec::new(),
            wrong: vec!["Booth Theatre".to_string()],
            min_wrong_matches: None,
        };

        let scan = verifier.scan("Unlike the staging at the Booth Theatre (1988), this one is spare.", &indicators);
        assert!(scan.wrong_hits.is_empty());
        assert_eq!(scan.suppressed[0].phrase, "(1988)");
    }

    #[test]
    fn test_unsuppressed_indicators_flag_wrong_production() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let show = revival("our-town-2024", "2024-10-17");
        let record = review(
            "our-town-2024",
            Some("Paul Newman is a gruff, wry Stage Manager, and Jane Curtin gives Mrs. Webb real bite."),
        );

        let finding = verifier.verify(0, &record, &show).unwrap();
        assert_eq!(finding.classification, Classification::LikelyWrongProduction);
        assert_eq!(finding.scan.wrong_hits.len(), 2);
        assert!(finding.reason.starts_with("likely_wrong_production"));

        let mut target = record.clone();
        assert!(apply_finding(&finding, &mut target));
        assert!(target.wrong_production);
        assert!(!apply_finding(&finding, &mut target));
    }

    #[test]
    fn test_expected_markers_downgrade_to_comparison() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let show = revival("our-town-2024", "2024-10-17");
        let record = review(
            "our-town-2024",
            Some("Jim Gaffigan and Zoey Deutch lead. Paul Newman once did this at the Booth Theatre."),
        );

        let finding = verifier.verify(0, &record, &show).unwrap();
        assert_eq!(finding.classification, Classification::ComparisonMentions);
        assert!(!finding.is_applicable());

        let mut target = record.clone();
        assert!(!apply_finding(&finding, &mut target));
        assert!(!target.wrong_production);
    }

    #[test]
    fn test_date_mismatch_precision() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let show = revival("x-2024", "2024-04-01");

        let mut preview_review = review("x-2024", None);
        preview_review.publish_date = Some("2023-11-15".to_string());
        assert!(verifier.verify(0, &preview_review, &show).is_none());

        let mut old_review = review("x-2024", None);
        old_review.publish_date = Some("2022-11-15".to_string());
        let finding = verifier.verify(0, &old_review, &show).unwrap();
        assert_eq!(finding.classification, Classification::LikelyWrongProduction);
        assert_eq!(finding.confidence, Confidence::High);
        assert!(finding.date_mismatch.is_some());
    }

    #[test]
    fn test_url_year_used_without_publish_date() {
        let (tables, thresholds) = fixtures();
        let verifier = ProductionVerifier::new(&tables, &thresholds);
        let show = revival("x-2024", "2024-04-01");

        let mut old = review("x-2024", None);
        old.url = Some("https://variety.com/2019/legit/reviews/x-review/".to_string());
        assert!(verifier.date_mismatch(&old, &show).is_some());

        let mut recent = review("x-2024", None);
        recent.url = Some("https://variety.com/2023/legit/reviews/x-review/".to_string());
        assert!(verifier.date_mismatch(&recent, &show).is_none());
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "ééééé paul newman ééééé";
        let start = text.find("paul").unwrap();
        let end = start + "paul newman".len();
        assert_eq!(context_around(text, start, end, 2), "é paul newman é");
        assert_eq!(context_around(text, start, end, 100), text);
    }
}
