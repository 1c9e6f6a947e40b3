//! Sighting merge engine
//!
//! Collapses the raw sightings of one show into one canonical review per
//! (show, outlet, critic). Each incoming sighting is tested against the
//! running groups in creation order and joins the first group it matches,
//! so insertion order decides which sightings are compared directly.
//! Groups that end up with the same key are coalesced at the end.

pub mod policy;

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::ResolverThresholds;
use crate::models::{CanonicalReview, ReviewRecord};
use crate::normalize::{critic_id, is_unknown_critic, normalize_url, OutletNormalizer};
use crate::similarity::{names_match_with, prefix_similarity};
use crate::tables::ReferenceTables;

pub use policy::merge_into;

/// Which equivalence branch merged two sightings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "similarity", rename_all = "kebab-case")]
pub enum MatchReason {
    SameUrl,
    SameKey,
    CriticNamesMatch,
    UnknownCriticExcerpt(f64),
    ExcerptSimilarity(f64),
    FullTextPrefix(f64),
}

/// One merge decision, for the audit trail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeEvent {
    /// Index of the group's first sighting
    pub primary: usize,
    /// Index of the sighting merged into it
    pub merged: usize,
    pub reason: MatchReason,
}

/// Result of merging one show's sightings
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub canonical: Vec<CanonicalReview>,
    pub events: Vec<MergeEvent>,
    /// Raw outlet labels that fell through the alias table
    pub unknown_outlets: BTreeSet<String>,
}

/// Comparison keys derived once per sighting
#[derive(Debug, Clone)]
struct SightingKeys {
    url: Option<String>,
    outlet_id: String,
    critic_id: String,
    critic_known: bool,
}

pub struct MergeEngine<'a> {
    outlets: OutletNormalizer<'a>,
    thresholds: &'a ResolverThresholds,
}

impl<'a> MergeEngine<'a> {
    pub fn new(tables: &'a ReferenceTables, thresholds: &'a ResolverThresholds) -> Self {
        Self {
            outlets: OutletNormalizer::new(&tables.outlets),
            thresholds,
        }
    }

    /// Canonical outlet id for a record: explicit id, then name, then URL domain
    pub fn outlet_id(&self, record: &ReviewRecord) -> String {
        self.outlet_label(record)
            .map(|label| self.outlets.normalize_outlet(label))
            .unwrap_or_else(|| self.outlets.normalize_outlet(""))
    }

    fn outlet_label<'r>(&self, record: &'r ReviewRecord) -> Option<&'r str> {
        [&record.outlet_id, &record.outlet, &record.url]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .find(|f| !f.trim().is_empty())
    }

    fn keys(&self, record: &ReviewRecord) -> SightingKeys {
        SightingKeys {
            url: record.url.as_deref().and_then(normalize_url),
            outlet_id: self.outlet_id(record),
            critic_id: critic_id(record.critic_name.as_deref()),
            critic_known: !is_unknown_critic(record.critic_name.as_deref()),
        }
    }

    /// Equivalence test between two sightings
    pub fn is_same_review(&self, a: &ReviewRecord, b: &ReviewRecord) -> bool {
        self.match_reason(a, b).is_some()
    }

    /// First equivalence branch that holds, if any
    pub fn match_reason(&self, a: &ReviewRecord, b: &ReviewRecord) -> Option<MatchReason> {
        self.match_keys(&self.keys(a), a, &self.keys(b), b)
    }

    fn match_keys(
        &self,
        ka: &SightingKeys,
        a: &ReviewRecord,
        kb: &SightingKeys,
        b: &ReviewRecord,
    ) -> Option<MatchReason> {
        // 1. Same normalized URL
        if let (Some(ua), Some(ub)) = (&ka.url, &kb.url) {
            if ua == ub {
                return Some(MatchReason::SameUrl);
            }
        }

        if ka.outlet_id != kb.outlet_id {
            return None;
        }

        // 2. Same (outlet, critic) key
        if ka.critic_id == kb.critic_id {
            return Some(MatchReason::SameKey);
        }

        // 3. Same outlet, critic names judged equal
        if ka.critic_known && kb.critic_known {
            let (Some(na), Some(nb)) = (a.critic_name.as_deref(), b.critic_name.as_deref()) else {
                return None;
            };
            if names_match_with(na, nb, self.thresholds.name_similarity) {
                return Some(MatchReason::CriticNamesMatch);
            }
        }

        let excerpt_sim = self.excerpt_similarity(a, b);

        // 4. Same outlet, one byline missing, excerpts reasonably close
        if (!ka.critic_known || !kb.critic_known)
            && excerpt_sim > self.thresholds.unknown_critic_excerpt_similarity
        {
            return Some(MatchReason::UnknownCriticExcerpt(excerpt_sim));
        }

        // 5. Same outlet, excerpts or full-text openings nearly identical
        if excerpt_sim > self.thresholds.excerpt_similarity {
            return Some(MatchReason::ExcerptSimilarity(excerpt_sim));
        }
        if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
            let prefix_sim = prefix_similarity(ta, tb, self.thresholds.full_text_prefix_chars);
            if prefix_sim > self.thresholds.full_text_prefix_similarity {
                return Some(MatchReason::FullTextPrefix(prefix_sim));
            }
        }

        None
    }

    /// Best similarity over all excerpt pairs (full text stands in when a side has none)
    fn excerpt_similarity(&self, a: &ReviewRecord, b: &ReviewRecord) -> f64 {
        let limit = self.thresholds.excerpt_compare_chars;
        let a_excerpts = comparable_excerpts(a);
        let b_excerpts = comparable_excerpts(b);

        a_excerpts
            .iter()
            .flat_map(|ea| b_excerpts.iter().map(move |eb| prefix_similarity(ea, eb, limit)))
            .fold(0.0, f64::max)
    }

    /// Merge all sightings of a single show
    pub fn merge_show(&self, sightings: &[&ReviewRecord]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut groups: Vec<(SightingKeys, CanonicalReview)> = Vec::new();

        for (index, sighting) in sightings.iter().enumerate() {
            if let Some(label) = self.outlet_label(sighting) {
                if !self.outlets.resolve(label).is_known() {
                    outcome.unknown_outlets.insert(label.trim().to_string());
                }
            }

            let keys = self.keys(sighting);
            let matched = groups.iter_mut().find_map(|(group_keys, group)| {
                self.match_keys(group_keys, &group.record, &keys, sighting)
                    .map(|reason| (group_keys, group, reason))
            });

            match matched {
                Some((group_keys, group, reason)) => {
                    debug!(
                        show = %sighting.show_id,
                        outlet = %keys.outlet_id,
                        ?reason,
                        "Merging sighting {} into group of {}",
                        index,
                        group.members[0]
                    );
                    outcome.events.push(MergeEvent {
                        primary: group.members[0],
                        merged: index,
                        reason,
                    });
                    merge_into(&mut group.record, sighting);
                    group.members.push(index);
                    *group_keys = self.keys(&group.record);
                    group.critic_id = group_keys.critic_id.clone();
                }
                None => {
                    let mut record = (*sighting).clone();
                    self.canonicalize(&mut record, &keys.outlet_id);
                    groups.push((
                        keys.clone(),
                        CanonicalReview {
                            outlet_id: keys.outlet_id.clone(),
                            critic_id: keys.critic_id.clone(),
                            record,
                            members: vec![index],
                        },
                    ));
                }
            }
        }

        outcome.canonical = coalesce_same_key(groups.into_iter().map(|(_, g)| g).collect());
        outcome
    }

    /// Stamp the canonical outlet id, display name and provenance list
    fn canonicalize(&self, record: &mut ReviewRecord, outlet_id: &str) {
        record.outlet_id = Some(outlet_id.to_string());
        if record.outlet.as_deref().map_or(true, |o| o.trim().is_empty()) {
            record.outlet = self.outlets.display_name(outlet_id).map(str::to_string);
        }
        record.sources = record.provenance().into_iter().collect();
    }
}

/// Text used for excerpt comparison: source excerpts, else the full text
fn comparable_excerpts(record: &ReviewRecord) -> Vec<&str> {
    let excerpts: Vec<&str> = record.excerpts().collect();
    if excerpts.is_empty() {
        record.text().into_iter().collect()
    } else {
        excerpts
    }
}

/// Fold later groups into earlier ones sharing (outletId, criticId)
fn coalesce_same_key(groups: Vec<CanonicalReview>) -> Vec<CanonicalReview> {
    let mut result: Vec<CanonicalReview> = Vec::with_capacity(groups.len());
    for group in groups {
        match result
            .iter_mut()
            .find(|g| g.outlet_id == group.outlet_id && g.critic_id == group.critic_id)
        {
            Some(existing) => {
                merge_into(&mut existing.record, &group.record);
                existing.members.extend(group.members);
            }
            None => result.push(group),
        }
    }
    result
}
