//! Audit report
//!
//! Everything a run decided, in one serializable value: the change list,
//! collisions with tier/confidence/reason, wrong-production findings,
//! score-source breakdown and per-show stats. Written to
//! `<root>/reports/<command>-<runId>.json` in apply mode and summarized
//! through tracing in every mode.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::collision::{CollisionOutcome, TierKind};
use crate::models::CanonicalReview;
use crate::scoring::ScoreBreakdown;
use crate::store::{write_json_if_changed, PersistSummary, SkippedFile, StoreError, REPORTS_DIR};
use crate::verify::{Classification, ProductionFinding};

/// Dry run (report only) or apply (persist changes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    DryRun,
    Apply,
}

impl RunMode {
    pub fn is_apply(self) -> bool {
        self == RunMode::Apply
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::DryRun => "dry-run",
            RunMode::Apply => "apply",
        }
    }
}

/// Pass that produced a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    GarbageText,
    Consolidate,
    ResolveCollisions,
    VerifyProductions,
    AssignScores,
    PurgeWrongShow,
}

impl PassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PassKind::GarbageText => "garbage-text",
            PassKind::Consolidate => "consolidate",
            PassKind::ResolveCollisions => "resolve-collisions",
            PassKind::VerifyProductions => "verify-productions",
            PassKind::AssignScores => "assign-scores",
            PassKind::PurgeWrongShow => "purge-wrong-show",
        }
    }
}

/// One mutation (made, or proposed in a dry run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub pass: PassKind,
    /// Review file relative to the reviews directory
    pub file: String,
    pub show_id: String,
    pub description: String,
}

/// Per-show aggregate counts over canonical reviews
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowStats {
    pub total: usize,
    pub with_url: usize,
    pub without_url: usize,
    pub with_full_text: usize,
    pub without_full_text: usize,
    pub needs_scoring: usize,
    pub needs_text: usize,
    /// Canonical reviews seen by each source
    pub sources: BTreeMap<String, usize>,
}

impl ShowStats {
    pub fn from_canonical(reviews: &[CanonicalReview]) -> Self {
        let mut stats = ShowStats::default();
        for review in reviews {
            stats.total += 1;
            if review.record.url.as_deref().is_some_and(|u| !u.trim().is_empty()) {
                stats.with_url += 1;
            } else {
                stats.without_url += 1;
            }
            if review.record.has_full_text() {
                stats.with_full_text += 1;
            } else {
                stats.without_full_text += 1;
            }
            if review.needs_scoring() {
                stats.needs_scoring += 1;
            }
            if review.needs_text() {
                stats.needs_text += 1;
            }
            for source in review.provenance() {
                *stats.sources.entry(source).or_default() += 1;
            }
        }
        stats
    }
}

/// A collision decision and whether it was (or would be) applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionEntry {
    #[serde(flatten)]
    pub outcome: CollisionOutcome,
    pub applied: bool,
}

/// A wrong-show review the purge pass kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeSkip {
    pub file: String,
    pub show_id: String,
    pub reason: String,
}

/// Binary that produced a report, as embedded by the build script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_rev: &'static str,
    pub built_at: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_rev: env!("CURTAIN_GIT_REV"),
            built_at: env!("CURTAIN_BUILD_TIME"),
            profile: env!("CURTAIN_BUILD_PROFILE"),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{} [{}] built {} ({})", self.version, self.git_rev, self.built_at, self.profile)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub run_id: Uuid,
    pub build: BuildInfo,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub mode: RunMode,
    pub root: PathBuf,
    pub changes: Vec<Change>,
    pub collisions: Vec<CollisionEntry>,
    pub tier_counts: BTreeMap<TierKind, usize>,
    pub findings: Vec<ProductionFinding>,
    pub scores: ScoreBreakdown,
    pub shows: BTreeMap<String, ShowStats>,
    pub unknown_outlets: BTreeSet<String>,
    pub purge_skipped: Vec<PurgeSkip>,
    pub skipped_files: Vec<SkippedFile>,
    pub persist: Option<PersistSummary>,
}

impl AuditReport {
    pub fn new(command: &str, mode: RunMode, root: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            build: BuildInfo::current(),
            started_at: Utc::now(),
            command: command.to_string(),
            mode,
            root: root.to_path_buf(),
            changes: Vec::new(),
            collisions: Vec::new(),
            tier_counts: BTreeMap::new(),
            findings: Vec::new(),
            scores: ScoreBreakdown::default(),
            shows: BTreeMap::new(),
            unknown_outlets: BTreeSet::new(),
            purge_skipped: Vec::new(),
            skipped_files: Vec::new(),
            persist: None,
        }
    }

    pub fn record_change(&mut self, pass: PassKind, file: &str, show_id: &str, description: String) {
        if self.mode.is_apply() {
            info!("[{}] {}: {}", pass.as_str(), file, description);
        }
        self.changes.push(Change {
            pass,
            file: file.to_string(),
            show_id: show_id.to_string(),
            description,
        });
    }

    pub fn record_collision(&mut self, outcome: CollisionOutcome, applied: bool) {
        *self.tier_counts.entry(outcome.decision.tier).or_default() += 1;
        self.collisions.push(CollisionEntry { outcome, applied });
    }

    pub fn changes_for(&self, pass: PassKind) -> usize {
        self.changes.iter().filter(|c| c.pass == pass).count()
    }

    /// Tier-by-tier counts and a per-show breakdown
    pub fn log_summary(&self) {
        let verb = if self.mode.is_apply() { "applied" } else { "proposed (dry run)" };
        info!(
            "{} [{}]: {} changes {}, {} files skipped",
            self.command,
            self.run_id,
            self.changes.len(),
            verb,
            self.skipped_files.len()
        );

        for pass in [
            PassKind::GarbageText,
            PassKind::Consolidate,
            PassKind::ResolveCollisions,
            PassKind::VerifyProductions,
            PassKind::AssignScores,
            PassKind::PurgeWrongShow,
        ] {
            let count = self.changes_for(pass);
            if count > 0 {
                info!("  {:<20} {} changes", pass.as_str(), count);
            }
        }

        for (tier, count) in &self.tier_counts {
            let applied = self
                .collisions
                .iter()
                .filter(|c| c.outcome.decision.tier == *tier && c.applied)
                .count();
            info!("  tier {:<16} {} collisions ({} applied)", tier.as_str(), count, applied);
        }

        if !self.findings.is_empty() {
            let mut per_class: BTreeMap<Classification, usize> = BTreeMap::new();
            for finding in &self.findings {
                *per_class.entry(finding.classification).or_default() += 1;
            }
            for (class, count) in per_class {
                info!("  {:<24} {} findings", class.as_str(), count);
            }
        }

        if !self.unknown_outlets.is_empty() {
            info!(
                "  {} outlet names not in the alias table: {:?}",
                self.unknown_outlets.len(),
                self.unknown_outlets
            );
        }

        for (show_id, stats) in &self.shows {
            info!(
                "  {}: {} reviews, {} with URL, {} with text, {} need scoring",
                show_id, stats.total, stats.with_url, stats.with_full_text, stats.needs_scoring
            );
        }
    }

    /// Write to `<root>/reports/<command>-<runId>.json`
    pub async fn write(&self) -> Result<PathBuf, StoreError> {
        let path = self
            .root
            .join(REPORTS_DIR)
            .join(format!("{}-{}.json", self.command, self.run_id));
        write_json_if_changed(&path, self).await?;
        info!("Report written to {}", path.display());
        Ok(path)
    }
}
