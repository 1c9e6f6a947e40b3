//! Report/apply controller
//!
//! Runs the passes over an in-memory [`ReviewStore`] and records every
//! mutation in the [`AuditReport`]. Passes mutate the in-memory records in
//! both modes so later passes see earlier decisions; only an apply run
//! persists them.
//!
//! `run` order: garbage text → merge → collisions → verification → scores.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::collision::{apply_outcome, CollisionResolver};
use crate::config::CurtainConfig;
use crate::garbage::GarbageTextDetector;
use crate::merge::MergeEngine;
use crate::models::{CanonicalReview, ReviewRecord, ReviewState, ShowRegistry};
use crate::report::{AuditReport, PassKind, PurgeSkip, RunMode, ShowStats};
use crate::scoring::{apply_assessment, assess_all, ScoreAssessment, ScoreCascade};
use crate::store::{
    load_registry, write_json_if_changed, ReviewStore, SkippedFile, StoreError, CONSOLIDATED_DIR,
};
use crate::tables::ReferenceTables;
use crate::verify::{apply_finding, ProductionVerifier};

/// Top-level operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Consolidate,
    ResolveCollisions,
    VerifyProductions,
    AssignScores,
    PurgeWrongShow,
    Run,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Consolidate => "consolidate",
            Command::ResolveCollisions => "resolve-collisions",
            Command::VerifyProductions => "verify-productions",
            Command::AssignScores => "assign-scores",
            Command::PurgeWrongShow => "purge-wrong-show",
            Command::Run => "run",
        }
    }
}

/// Consolidated output for one show
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedShow {
    pub show_id: String,
    pub title: Option<String>,
    pub stats: ShowStats,
    pub reviews: Vec<CanonicalReview>,
}

pub struct Pipeline<'a> {
    config: &'a CurtainConfig,
    tables: &'a ReferenceTables,
    mode: RunMode,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a CurtainConfig, tables: &'a ReferenceTables, mode: RunMode) -> Self {
        Self { config, tables, mode }
    }

    /// Load the store, run `command`, persist (apply mode) and report
    ///
    /// Registry failure is the only error returned; it is fatal in apply
    /// mode. Per-file failures end up in the report.
    pub async fn execute(&self, command: Command, root: &Path) -> Result<AuditReport, StoreError> {
        let mut report = AuditReport::new(command.as_str(), self.mode, root);
        let registry = load_registry(root).await?;
        let mut store = ReviewStore::load(root).await;
        report.skipped_files = store.skipped.clone();

        match command {
            Command::Consolidate => {
                self.clean_garbage(&mut store, &mut report);
                self.consolidate(&mut store, &mut report);
            }
            Command::ResolveCollisions => self.resolve_collisions(&mut store, &registry, &mut report),
            Command::VerifyProductions => self.verify_productions(&mut store, &registry, &mut report),
            Command::AssignScores => self.assign_scores(&mut store, &mut report),
            Command::PurgeWrongShow => self.purge_wrong_show(&mut store, &registry, &mut report).await,
            Command::Run => {
                self.clean_garbage(&mut store, &mut report);
                self.consolidate(&mut store, &mut report);
                self.resolve_collisions(&mut store, &registry, &mut report);
                self.verify_productions(&mut store, &registry, &mut report);
                self.assign_scores(&mut store, &mut report);
            }
        }

        let consolidated = self.canonical_view(&store, &registry, &mut report);

        if self.mode.is_apply() {
            let summary = store.persist().await;
            report.skipped_files.extend(summary.failed.iter().cloned());
            report.persist = Some(summary);

            if matches!(command, Command::Consolidate | Command::Run) {
                self.write_consolidated(root, &consolidated, &mut report).await;
            }
            if let Err(e) = report.write().await {
                error!("Failed to write report: {}", e);
            }
        }

        report.log_summary();
        Ok(report)
    }

    /// Null error-page and paywall text
    pub fn clean_garbage(&self, store: &mut ReviewStore, report: &mut AuditReport) {
        let detector = GarbageTextDetector::new(&self.config.thresholds);
        for review in store.reviews.iter_mut().filter(|r| r.record.is_active()) {
            if let Some(verdict) = detector.clean(&mut review.record) {
                report.record_change(
                    PassKind::GarbageText,
                    &review.relative,
                    &review.record.show_id,
                    format!("fullText nulled ({})", verdict.reason()),
                );
            }
        }
    }

    /// Merge duplicate sightings per show
    ///
    /// The first file of each group (by path) receives the merged record;
    /// the other files are marked `duplicateOf` that file.
    pub fn consolidate(&self, store: &mut ReviewStore, report: &mut AuditReport) {
        let engine = MergeEngine::new(self.tables, &self.config.thresholds);

        for indices in active_by_show(store).into_values() {
            let outcome = {
                let sightings: Vec<&ReviewRecord> = indices.iter().map(|&i| &store.reviews[i].record).collect();
                engine.merge_show(&sightings)
            };
            report.unknown_outlets.extend(outcome.unknown_outlets);

            for canonical in outcome.canonical.into_iter().filter(|c| c.members.len() > 1) {
                let primary_index = indices[canonical.members[0]];
                let primary_file = store.reviews[primary_index].relative.clone();
                let show_id = canonical.record.show_id.clone();

                if store.reviews[primary_index].record != canonical.record {
                    store.reviews[primary_index].record = canonical.record;
                    report.record_change(
                        PassKind::Consolidate,
                        &primary_file,
                        &show_id,
                        format!("merged {} sightings into this review", canonical.members.len()),
                    );
                }

                for &member in &canonical.members[1..] {
                    let review = &mut store.reviews[indices[member]];
                    if review.record.mark_duplicate_of(&primary_file) {
                        report.record_change(
                            PassKind::Consolidate,
                            &review.relative,
                            &show_id,
                            format!("duplicateOf {}", primary_file),
                        );
                    }
                }
            }
        }
    }

    /// Cross-show URL collisions
    pub fn resolve_collisions(&self, store: &mut ReviewStore, registry: &ShowRegistry, report: &mut AuditReport) {
        let resolver = CollisionResolver::new(self.tables, &self.config.thresholds);
        let policy = &self.config.collision;
        let outcomes = resolver.resolve_all(&store.records(), registry);

        for outcome in outcomes {
            let changes = {
                let mut records = store.records_mut();
                apply_outcome(&outcome, policy, &mut records)
            };
            for change in &changes {
                let file = store.reviews[change.index].relative.clone();
                report.record_change(PassKind::ResolveCollisions, &file, &change.show_id, change.change.clone());
            }
            let applied = outcome.is_applicable(policy);
            report.record_collision(outcome, applied);
        }
    }

    /// Wrong-production content check for revivals
    pub fn verify_productions(&self, store: &mut ReviewStore, registry: &ShowRegistry, report: &mut AuditReport) {
        let verifier = ProductionVerifier::new(self.tables, &self.config.thresholds);
        let findings = verifier.verify_all(&store.records(), registry);

        for finding in findings {
            let review = &mut store.reviews[finding.index];
            if apply_finding(&finding, &mut review.record) {
                report.record_change(
                    PassKind::VerifyProductions,
                    &review.relative,
                    &finding.show_id,
                    format!("wrongProduction ({})", finding.reason),
                );
            }
            report.findings.push(finding);
        }
    }

    /// Score cascade over active reviews
    pub fn assign_scores(&self, store: &mut ReviewStore, report: &mut AuditReport) {
        let cascade = ScoreCascade::new(&self.config.thresholds);
        let (assessments, breakdown) = assess_all(&cascade, &store.records());

        for (index, assessment) in assessments {
            let review = &mut store.reviews[index];
            if apply_assessment(&mut review.record, &assessment) {
                let description = match &assessment {
                    ScoreAssessment::Scored(result) => format!(
                        "assignedScore {} ({}, {}: {})",
                        result.score,
                        result.source.as_str(),
                        result.confidence,
                        result.evidence
                    ),
                    ScoreAssessment::ToBeCalculated => "scoreStatus to-be-calculated".to_string(),
                    ScoreAssessment::Kept { .. } => continue,
                };
                report.record_change(PassKind::AssignScores, &review.relative, &review.record.show_id, description);
            }
        }
        report.scores = breakdown;
    }

    /// Delete wrong-show files when a second, narrower check agrees
    ///
    /// The named owner must be a registered show other than this one and
    /// must hold an active review from the same outlet.
    pub async fn purge_wrong_show(&self, store: &mut ReviewStore, registry: &ShowRegistry, report: &mut AuditReport) {
        let engine = MergeEngine::new(self.tables, &self.config.thresholds);
        let mut confirmed: Vec<usize> = Vec::new();

        for (index, review) in store.reviews.iter().enumerate() {
            let record = &review.record;
            if !record.wrong_show {
                continue;
            }
            match self.purge_blocker(record, store, registry, &engine) {
                None => confirmed.push(index),
                Some(reason) => report.purge_skipped.push(PurgeSkip {
                    file: review.relative.clone(),
                    show_id: record.show_id.clone(),
                    reason,
                }),
            }
        }

        // Highest index first so earlier indices stay valid
        for index in confirmed.into_iter().rev() {
            let review = &store.reviews[index];
            if !review.record.state().can_transition_to(&ReviewState::Deleted) {
                continue;
            }
            let file = review.relative.clone();
            let show_id = review.record.show_id.clone();
            let description = format!(
                "deleted (wrongShow: {})",
                review.record.wrong_show_reason.as_deref().unwrap_or("no reason recorded")
            );

            if self.mode.is_apply() {
                if let Err(e) = store.delete(index).await {
                    warn!("{}", e);
                    report.purge_skipped.push(PurgeSkip {
                        file,
                        show_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            }
            report.record_change(PassKind::PurgeWrongShow, &file, &show_id, description);
        }

        info!(
            "Purge: {} confirmed, {} kept for manual review",
            report.changes_for(PassKind::PurgeWrongShow),
            report.purge_skipped.len()
        );
    }

    /// Why a wrong-show review must be kept, if it must
    fn purge_blocker(
        &self,
        record: &ReviewRecord,
        store: &ReviewStore,
        registry: &ShowRegistry,
        engine: &MergeEngine<'_>,
    ) -> Option<String> {
        let Some(owner) = record.wrong_show_owner.as_deref() else {
            return Some("no owning show recorded".to_string());
        };
        if owner == record.show_id {
            return Some(format!("owner {} is the review's own show", owner));
        }
        if !registry.contains(owner) {
            return Some(format!("owner {} is not in the show registry", owner));
        }

        let outlet = engine.outlet_id(record);
        let owner_has_copy = store
            .reviews
            .iter()
            .map(|r| &r.record)
            .any(|r| r.show_id == owner && r.is_active() && engine.outlet_id(r) == outlet);
        if !owner_has_copy {
            return Some(format!("{} has no active review from {}", owner, outlet));
        }
        None
    }

    /// Canonical reviews and stats per show over the current active records
    fn canonical_view(
        &self,
        store: &ReviewStore,
        registry: &ShowRegistry,
        report: &mut AuditReport,
    ) -> Vec<ConsolidatedShow> {
        let engine = MergeEngine::new(self.tables, &self.config.thresholds);
        let mut shows = Vec::new();

        for (show_id, indices) in active_by_show(store) {
            let sightings: Vec<&ReviewRecord> = indices.iter().map(|&i| &store.reviews[i].record).collect();
            let outcome = engine.merge_show(&sightings);
            let stats = ShowStats::from_canonical(&outcome.canonical);
            report.shows.insert(show_id.clone(), stats.clone());
            shows.push(ConsolidatedShow {
                title: registry.get(&show_id).map(|s| s.title.clone()),
                show_id,
                stats,
                reviews: outcome.canonical,
            });
        }
        shows
    }

    async fn write_consolidated(&self, root: &Path, shows: &[ConsolidatedShow], report: &mut AuditReport) {
        let dir: PathBuf = root.join(CONSOLIDATED_DIR);
        let mut written = 0;
        for show in shows {
            let path = dir.join(format!("{}.json", show.show_id));
            match write_json_if_changed(&path, show).await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("{}", e);
                    report.skipped_files.push(SkippedFile {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!("Consolidated output: {} of {} show files updated", written, shows.len());
    }
}

/// Active review indices grouped by show, in store order
fn active_by_show(store: &ReviewStore) -> BTreeMap<String, Vec<usize>> {
    let mut by_show: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, review) in store.reviews.iter().enumerate() {
        if review.record.is_active() {
            by_show.entry(review.record.show_id.clone()).or_default().push(index);
        }
    }
    by_show
}
