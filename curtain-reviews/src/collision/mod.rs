//! Cross-show collision resolver
//!
//! A collision is one normalized URL filed under two or more shows. The
//! index is built over every active review of every show before any
//! decision is made; reviews already flagged by an earlier pass and
//! reviews of shows missing from the registry are left out.
//!
//! Resolution runs the tiers in [`tiers::default_tiers`] order and stops at
//! the first tier that claims the collision.

pub mod tiers;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{CollisionPolicy, ResolverThresholds};
use crate::models::{strip_year_suffix, Confidence, ReviewRecord, ShowRegistry};
use crate::normalize::normalize_url;
use crate::scoring::ScoreCascade;
use crate::tables::ReferenceTables;

use curtain_common::dates::parse_optional_date;

pub use tiers::{default_tiers, CollisionTier, TierContext};

/// One show's side of a collision (all of its reviews carrying the URL)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub show_id: String,
    /// Indices of the show's reviews with this URL in the input slice
    #[serde(skip)]
    pub members: Vec<usize>,
    pub publish_date: Option<NaiveDate>,
    pub opening_date: Option<NaiveDate>,
    pub has_score: bool,
    pub has_text: bool,
}

impl Candidate {
    pub fn has_signal(&self) -> bool {
        self.has_score || self.has_text
    }

    /// Show id without its `-YYYY` suffix
    pub fn base_title(&self) -> &str {
        strip_year_suffix(&self.show_id).0
    }

    /// Days between publish and opening, if both are known
    pub fn days_from_opening(&self) -> Option<i64> {
        match (self.publish_date, self.opening_date) {
            (Some(published), Some(opening)) => Some((published - opening).num_days().abs()),
            _ => None,
        }
    }

    fn signal_summary(&self) -> &'static str {
        match (self.has_score, self.has_text) {
            (true, true) => "score and full text",
            (true, false) => "a score",
            (false, true) => "full text",
            (false, false) => "no score or text",
        }
    }
}

/// A URL shared by two or more shows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub url: String,
    /// Sorted by show id
    pub candidates: Vec<Candidate>,
}

impl Collision {
    pub fn show_ids(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.show_id.clone()).collect()
    }

    /// Every candidate shares one base title (revivals of the same work)
    pub fn is_revival_pair(&self) -> bool {
        let mut titles = self.candidates.iter().map(Candidate::base_title);
        match titles.next() {
            Some(first) => titles.all(|t| t == first),
            None => false,
        }
    }

    pub fn candidate(&self, show_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.show_id == show_id)
    }
}

/// Which tier claimed a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TierKind {
    Generic,
    DateProximity,
    Revival,
    NonRevival,
    KnownMapping,
    NoSignal,
    Unresolved,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::DateProximity => "date-proximity",
            Self::Revival => "revival",
            Self::NonRevival => "non-revival",
            Self::KnownMapping => "known-mapping",
            Self::NoSignal => "no-signal",
            Self::Unresolved => "unresolved",
        }
    }
}

/// What a tier wants done
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Resolution {
    /// Null the URL on every candidate
    NullUrl,
    /// One show owns the URL; the others are flagged wrongShow
    Winner { winner: String, losers: Vec<String> },
    /// No owner can be named, but these shows are certainly not it
    FlagLosers { losers: Vec<String> },
    /// Legitimately shared; leave every candidate alone
    Suppress,
    /// No tier could decide
    Unresolved,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDecision {
    pub tier: TierKind,
    pub confidence: Confidence,
    #[serde(flatten)]
    pub resolution: Resolution,
    /// Evidence behind the decision, written into flagged records
    pub reason: String,
}

/// A collision together with the decision reached for it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionOutcome {
    pub collision: Collision,
    pub decision: TierDecision,
}

impl CollisionOutcome {
    /// Whether the decision mutates the store under `policy`
    ///
    /// URL null-outs always apply. Winner and loser flags apply only at or
    /// above the policy's minimum confidence.
    pub fn is_applicable(&self, policy: &CollisionPolicy) -> bool {
        match self.decision.resolution {
            Resolution::NullUrl => true,
            Resolution::Winner { .. } | Resolution::FlagLosers { .. } => {
                self.decision.confidence >= policy.min_apply_confidence
            }
            Resolution::Suppress | Resolution::Unresolved => false,
        }
    }
}

/// One record mutation produced by applying a collision decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    /// Index in the mutated slice
    #[serde(skip)]
    pub index: usize,
    pub show_id: String,
    pub change: String,
}

/// Index over all shows' review URLs
///
/// # Arguments
/// * `records` - Every review in the store, in store order
/// * `registry` - Show metadata (reviews of unknown shows are skipped)
/// * `cascade` - Decides which copies carry a rating of their own
///
/// # Returns
/// Collisions sorted by normalized URL
pub fn find_collisions(
    records: &[&ReviewRecord],
    registry: &ShowRegistry,
    cascade: &ScoreCascade,
) -> Vec<Collision> {
    let mut index: BTreeMap<String, BTreeMap<String, Candidate>> = BTreeMap::new();

    for (i, record) in records.iter().enumerate() {
        if !record.is_active() {
            continue;
        }
        let Some(show) = registry.get(&record.show_id) else {
            continue;
        };
        let Some(url) = record.url.as_deref().and_then(normalize_url) else {
            continue;
        };

        let candidate = index
            .entry(url)
            .or_default()
            .entry(record.show_id.clone())
            .or_insert_with(|| Candidate {
                show_id: record.show_id.clone(),
                members: Vec::new(),
                publish_date: None,
                opening_date: show.opening(),
                has_score: false,
                has_text: false,
            });
        candidate.members.push(i);
        candidate.has_score |= cascade.has_rating_evidence(record);
        candidate.has_text |= record.has_full_text();
        if candidate.publish_date.is_none() {
            candidate.publish_date = parse_optional_date(record.publish_date.as_deref());
        }
    }

    index
        .into_iter()
        .filter(|(_, by_show)| by_show.len() >= 2)
        .map(|(url, by_show)| Collision {
            url,
            candidates: by_show.into_values().collect(),
        })
        .collect()
}

/// Ordered tier cascade over a collision index
pub struct CollisionResolver<'a> {
    tiers: Vec<Box<dyn CollisionTier>>,
    cascade: ScoreCascade,
    context: TierContext<'a>,
}

impl<'a> CollisionResolver<'a> {
    pub fn new(tables: &'a ReferenceTables, thresholds: &'a ResolverThresholds) -> Self {
        Self::with_tiers(default_tiers(), tables, thresholds)
    }

    /// Resolver with a custom tier chain (tests, experiments)
    pub fn with_tiers(
        tiers: Vec<Box<dyn CollisionTier>>,
        tables: &'a ReferenceTables,
        thresholds: &'a ResolverThresholds,
    ) -> Self {
        Self {
            tiers,
            cascade: ScoreCascade::new(thresholds),
            context: TierContext { tables, thresholds },
        }
    }

    /// Run the tiers top to bottom; the first decision wins
    pub fn resolve(&self, collision: &Collision) -> TierDecision {
        for tier in &self.tiers {
            if let Some(decision) = tier.evaluate(collision, &self.context) {
                debug!(
                    url = %collision.url,
                    tier = tier.kind().as_str(),
                    confidence = %decision.confidence,
                    "Collision claimed: {}",
                    decision.reason
                );
                if decision.tier == TierKind::NoSignal {
                    warn!(
                        url = %collision.url,
                        shows = ?collision.show_ids(),
                        "Collision fell through to the no-signal tier; consider a known mapping"
                    );
                }
                return decision;
            }
        }

        TierDecision {
            tier: TierKind::Unresolved,
            confidence: Confidence::Low,
            resolution: Resolution::Unresolved,
            reason: format!(
                "no tier could decide between {} (manual review)",
                collision.show_ids().join(", ")
            ),
        }
    }

    /// Find and resolve every collision
    pub fn resolve_all(&self, records: &[&ReviewRecord], registry: &ShowRegistry) -> Vec<CollisionOutcome> {
        let outcomes: Vec<CollisionOutcome> = find_collisions(records, registry, &self.cascade)
            .into_iter()
            .map(|collision| {
                let decision = self.resolve(&collision);
                CollisionOutcome { collision, decision }
            })
            .collect();

        let mut per_tier: BTreeMap<&str, usize> = BTreeMap::new();
        for outcome in &outcomes {
            *per_tier.entry(outcome.decision.tier.as_str()).or_default() += 1;
        }
        info!("Collisions: {} total, by tier {:?}", outcomes.len(), per_tier);

        outcomes
    }
}

/// Apply one decision to the records it names
///
/// Returns the mutations made. Records that an earlier decision in the
/// same run already flagged are left alone, so applying twice is a no-op.
pub fn apply_outcome(
    outcome: &CollisionOutcome,
    policy: &CollisionPolicy,
    records: &mut [&mut ReviewRecord],
) -> Vec<AppliedChange> {
    let mut changes = Vec::new();
    if !outcome.is_applicable(policy) {
        return changes;
    }

    let decision = &outcome.decision;
    let tier = decision.tier.as_str();
    match &decision.resolution {
        Resolution::NullUrl => {
            for candidate in &outcome.collision.candidates {
                for &i in &candidate.members {
                    let reason = format!("{} tier: {}", tier, decision.reason);
                    if records[i].null_url(&reason) {
                        changes.push(AppliedChange {
                            index: i,
                            show_id: candidate.show_id.clone(),
                            change: format!("url nulled ({})", reason),
                        });
                    }
                }
            }
        }
        Resolution::Winner { winner, losers } => {
            flag_losers(outcome, losers, Some(winner), &mut changes, records);
        }
        Resolution::FlagLosers { losers } => {
            flag_losers(outcome, losers, None, &mut changes, records);
        }
        Resolution::Suppress | Resolution::Unresolved => {}
    }

    changes
}

fn flag_losers(
    outcome: &CollisionOutcome,
    losers: &[String],
    winner: Option<&String>,
    changes: &mut Vec<AppliedChange>,
    records: &mut [&mut ReviewRecord],
) {
    let reason = format!("{} tier: {}", outcome.decision.tier.as_str(), outcome.decision.reason);
    for loser in losers {
        let Some(candidate) = outcome.collision.candidate(loser) else {
            continue;
        };
        for &i in &candidate.members {
            if records[i].flag_wrong_show(&reason, winner.map(String::as_str)) {
                changes.push(AppliedChange {
                    index: i,
                    show_id: loser.clone(),
                    change: format!("wrongShow ({})", reason),
                });
            }
        }
    }
}
