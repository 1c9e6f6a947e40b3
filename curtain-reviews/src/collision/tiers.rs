//! Collision tiers
//!
//! Each tier is a small rule: it either claims a collision with a
//! decision or passes it on. Tiers never look at a collision another tier
//! has claimed, so at most one decision exists per collision.

use crate::config::ResolverThresholds;
use crate::models::Confidence;
use crate::tables::ReferenceTables;

use super::{Candidate, Collision, Resolution, TierDecision, TierKind};

/// Read-only inputs shared by all tiers
#[derive(Debug, Clone, Copy)]
pub struct TierContext<'a> {
    pub tables: &'a ReferenceTables,
    pub thresholds: &'a ResolverThresholds,
}

pub trait CollisionTier: Send + Sync {
    fn kind(&self) -> TierKind;

    /// Claim the collision with a decision, or `None` to pass it on
    fn evaluate(&self, collision: &Collision, ctx: &TierContext<'_>) -> Option<TierDecision>;
}

/// Standard tier order
pub fn default_tiers() -> Vec<Box<dyn CollisionTier>> {
    vec![
        Box::new(GenericUrlTier),
        Box::new(DateProximityTier),
        Box::new(RevivalTier),
        Box::new(NonRevivalTier),
        Box::new(KnownMappingTier),
        Box::new(NoSignalTier),
    ]
}

fn decision(
    tier: TierKind,
    confidence: Confidence,
    resolution: Resolution,
    reason: String,
) -> Option<TierDecision> {
    Some(TierDecision {
        tier,
        confidence,
        resolution,
        reason,
    })
}

fn winner(collision: &Collision, winner: &Candidate) -> Resolution {
    Resolution::Winner {
        winner: winner.show_id.clone(),
        losers: collision
            .candidates
            .iter()
            .filter(|c| c.show_id != winner.show_id)
            .map(|c| c.show_id.clone())
            .collect(),
    }
}

/// The single candidate matching `pred`, if exactly one does
fn only<'c>(collision: &'c Collision, pred: impl Fn(&Candidate) -> bool) -> Option<&'c Candidate> {
    let mut matching = collision.candidates.iter().filter(|c| pred(c));
    let first = matching.next()?;
    matching.next().is_none().then_some(first)
}

/// Two productions opening this close together share preview coverage
fn is_double_bill(collision: &Collision, ctx: &TierContext<'_>) -> bool {
    let [a, b] = collision.candidates.as_slice() else {
        return false;
    };
    match (a.opening_date, b.opening_date) {
        (Some(x), Some(y)) => (x - y).num_days().abs() <= ctx.thresholds.double_bill_days,
        _ => false,
    }
}

/// Score-then-text presence test shared by the revival and non-revival tiers
fn unique_signal<'c>(collision: &'c Collision) -> Option<(&'c Candidate, &'static str)> {
    if let Some(scored) = only(collision, |c| c.has_score) {
        return Some((scored, "score"));
    }
    only(collision, |c| c.has_text).map(|texted| (texted, "full text"))
}

fn describe_others(collision: &Collision, except: &str) -> String {
    collision
        .candidates
        .iter()
        .filter(|c| c.show_id != except)
        .map(|c| format!("{} has {}", c.show_id, c.signal_summary()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tier 1: a URL shared by many shows is a navigation or ad link
pub struct GenericUrlTier;

impl CollisionTier for GenericUrlTier {
    fn kind(&self) -> TierKind {
        TierKind::Generic
    }

    fn evaluate(&self, collision: &Collision, ctx: &TierContext<'_>) -> Option<TierDecision> {
        let shows = collision.candidates.len();
        if shows < ctx.thresholds.generic_url_min_shows {
            return None;
        }
        decision(
            self.kind(),
            Confidence::Certain,
            Resolution::NullUrl,
            format!(
                "URL shared by {} shows (>= {}), treated as a generic link",
                shows, ctx.thresholds.generic_url_min_shows
            ),
        )
    }
}

/// Tier 2: publish date close to exactly one show's opening
pub struct DateProximityTier;

impl CollisionTier for DateProximityTier {
    fn kind(&self) -> TierKind {
        TierKind::DateProximity
    }

    fn evaluate(&self, collision: &Collision, ctx: &TierContext<'_>) -> Option<TierDecision> {
        if collision.candidates.len() != 2 || collision.is_revival_pair() || is_double_bill(collision, ctx) {
            return None;
        }

        let mut distances: Vec<(&Candidate, i64)> = collision
            .candidates
            .iter()
            .map(|c| c.days_from_opening().map(|d| (c, d)))
            .collect::<Option<Vec<_>>>()?;
        distances.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.show_id.cmp(&b.0.show_id)));

        let window = ctx.thresholds.date_proximity_days;
        let within = distances.iter().filter(|(_, d)| *d <= window).count();
        let (closest, closest_days) = distances[0];
        let (runner_up, runner_up_days) = distances[1];

        let (confidence, qualifier) = match within {
            0 => return None,
            1 => (Confidence::High, "only show"),
            _ => (Confidence::Medium, "closest of several shows"),
        };

        decision(
            self.kind(),
            confidence,
            winner(collision, closest),
            format!(
                "published {} days from {} opening ({} within {} days); {} is {} days away",
                closest_days, closest.show_id, qualifier, window, runner_up.show_id, runner_up_days
            ),
        )
    }
}

/// Tier 3: revivals of one title, decided by score/text presence or recency
pub struct RevivalTier;

impl CollisionTier for RevivalTier {
    fn kind(&self) -> TierKind {
        TierKind::Revival
    }

    fn evaluate(&self, collision: &Collision, _ctx: &TierContext<'_>) -> Option<TierDecision> {
        if !collision.is_revival_pair() {
            return None;
        }

        // (a) unique score, (b) unique full text
        if let Some((owner, signal)) = unique_signal(collision) {
            return decision(
                self.kind(),
                Confidence::High,
                winner(collision, owner),
                format!(
                    "revival of '{}': {} is the only production with {} for this URL; {}",
                    owner.base_title(),
                    owner.show_id,
                    signal,
                    describe_others(collision, &owner.show_id)
                ),
            );
        }

        let with_signal: Vec<&Candidate> = collision.candidates.iter().filter(|c| c.has_signal()).collect();

        // (c) no signal anywhere: most recent production
        if with_signal.is_empty() {
            let mut dated: Vec<&Candidate> = collision.candidates.iter().filter(|c| c.opening_date.is_some()).collect();
            if dated.len() != collision.candidates.len() {
                return None;
            }
            dated.sort_by_key(|c| c.opening_date);
            let newest = dated[dated.len() - 1];
            if dated.len() >= 2 && dated[dated.len() - 2].opening_date == newest.opening_date {
                return None;
            }
            return decision(
                self.kind(),
                Confidence::Medium,
                winner(collision, newest),
                format!(
                    "revival of '{}': no production has score or text; {} is the most recent (opened {})",
                    newest.base_title(),
                    newest.show_id,
                    newest.opening_date.map(|d| d.to_string()).unwrap_or_default()
                ),
            );
        }

        // (d) several productions carry signal, the rest are not the owner
        let without: Vec<&Candidate> = collision.candidates.iter().filter(|c| !c.has_signal()).collect();
        if collision.candidates.len() >= 3 && with_signal.len() >= 2 && !without.is_empty() {
            return decision(
                self.kind(),
                Confidence::High,
                Resolution::FlagLosers {
                    losers: without.iter().map(|c| c.show_id.clone()).collect(),
                },
                format!(
                    "revival of '{}': {} of {} productions carry score or text ({}); the rest have none",
                    with_signal[0].base_title(),
                    with_signal.len(),
                    collision.candidates.len(),
                    with_signal.iter().map(|c| c.show_id.as_str()).collect::<Vec<_>>().join(", ")
                ),
            );
        }

        None
    }
}

/// Tier 4: two different titles, decided by score/text presence
pub struct NonRevivalTier;

impl CollisionTier for NonRevivalTier {
    fn kind(&self) -> TierKind {
        TierKind::NonRevival
    }

    fn evaluate(&self, collision: &Collision, ctx: &TierContext<'_>) -> Option<TierDecision> {
        if collision.candidates.len() != 2 || collision.is_revival_pair() {
            return None;
        }

        if is_double_bill(collision, ctx) {
            let [a, b] = collision.candidates.as_slice() else {
                return None;
            };
            return decision(
                self.kind(),
                Confidence::Medium,
                Resolution::Suppress,
                format!(
                    "double bill: {} and {} open within {} days of each other, the URL may cover both",
                    a.show_id, b.show_id, ctx.thresholds.double_bill_days
                ),
            );
        }

        let (owner, signal) = unique_signal(collision)?;
        decision(
            self.kind(),
            Confidence::High,
            winner(collision, owner),
            format!(
                "non-revival: {} is the only show with {} for this URL; {}",
                owner.show_id,
                signal,
                describe_others(collision, &owner.show_id)
            ),
        )
    }
}

/// Tier 5: curated wrong→correct show id pairs
pub struct KnownMappingTier;

impl CollisionTier for KnownMappingTier {
    fn kind(&self) -> TierKind {
        TierKind::KnownMapping
    }

    fn evaluate(&self, collision: &Collision, ctx: &TierContext<'_>) -> Option<TierDecision> {
        collision.candidates.iter().find_map(|candidate| {
            let mapping = ctx.tables.known_correction(&candidate.show_id)?;
            let owner = collision.candidate(&mapping.correct)?;
            let note = mapping
                .note
                .as_deref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default();
            decision(
                self.kind(),
                Confidence::High,
                winner(collision, owner),
                format!(
                    "known mapping: {} belongs to {}{}",
                    mapping.wrong, mapping.correct, note
                ),
            )
        })
    }
}

/// Tier 6: nothing to go on; drop the URL instead of guessing an owner
pub struct NoSignalTier;

impl CollisionTier for NoSignalTier {
    fn kind(&self) -> TierKind {
        TierKind::NoSignal
    }

    fn evaluate(&self, collision: &Collision, _ctx: &TierContext<'_>) -> Option<TierDecision> {
        let any_signal = collision.candidates.iter().any(Candidate::has_signal);
        let any_dates = collision.candidates.iter().any(|c| c.days_from_opening().is_some());
        if any_signal || any_dates {
            return None;
        }
        decision(
            self.kind(),
            Confidence::Low,
            Resolution::NullUrl,
            format!(
                "no score, text or usable dates on any of {} shows, treated as a generic link",
                collision.candidates.len()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionResolver;
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn candidate(show_id: &str) -> Candidate {
        Candidate {
            show_id: show_id.to_string(),
            members: vec![0],
            publish_date: None,
            opening_date: None,
            has_score: false,
            has_text: false,
        }
    }

    fn collision(candidates: Vec<Candidate>) -> Collision {
        Collision {
            url: "https://example.com/review".to_string(),
            candidates,
        }
    }

    fn resolve(collision: &Collision) -> TierDecision {
        let tables = ReferenceTables::builtin().unwrap();
        let thresholds = ResolverThresholds::default();
        CollisionResolver::new(&tables, &thresholds).resolve(collision)
    }

    #[test]
    fn test_generic_tier_claims_before_any_other() {
        let mut candidates: Vec<Candidate> = (0..5).map(|i| candidate(&format!("show-{}", i))).collect();
        candidates[0].has_score = true;
        candidates[0].publish_date = ymd(2024, 1, 1);
        candidates[0].opening_date = ymd(2024, 1, 5);

        let decision = resolve(&collision(candidates));
        assert_eq!(decision.tier, TierKind::Generic);
        assert_eq!(decision.confidence, Confidence::Certain);
        assert_eq!(decision.resolution, Resolution::NullUrl);
        assert!(decision.reason.contains("5 shows"));
    }

    #[test]
    fn test_date_tier_unique_window_is_high() {
        let mut a = candidate("stereophonic-2024");
        a.publish_date = ymd(2024, 4, 20);
        a.opening_date = ymd(2024, 4, 19);
        let mut b = candidate("the-outsiders-2024");
        b.publish_date = ymd(2024, 4, 20);
        b.opening_date = ymd(2024, 1, 11);
        b.has_score = true;

        let decision = resolve(&collision(vec![a, b]));
        assert_eq!(decision.tier, TierKind::DateProximity);
        assert_eq!(decision.confidence, Confidence::High);
        assert_eq!(
            decision.resolution,
            Resolution::Winner {
                winner: "stereophonic-2024".to_string(),
                losers: vec!["the-outsiders-2024".to_string()],
            }
        );
        assert!(decision.reason.contains("1 days"));
        assert!(decision.reason.contains("100 days"));
    }

    #[test]
    fn test_revival_unique_score_wins() {
        let mut old = candidate("hair-2009");
        old.has_score = true;
        let new = candidate("hair-2011");

        let decision = resolve(&collision(vec![old, new]));
        assert_eq!(decision.tier, TierKind::Revival);
        assert_eq!(decision.confidence, Confidence::High);
        assert!(matches!(decision.resolution, Resolution::Winner { ref winner, .. } if winner == "hair-2009"));
    }

    #[test]
    fn test_revival_without_signal_prefers_most_recent() {
        let mut old = candidate("cabaret-2014");
        old.opening_date = ymd(2014, 4, 24);
        let mut new = candidate("cabaret-2024");
        new.opening_date = ymd(2024, 4, 21);

        let decision = resolve(&collision(vec![old, new]));
        assert_eq!(decision.tier, TierKind::Revival);
        assert_eq!(decision.confidence, Confidence::Medium);
        assert!(matches!(decision.resolution, Resolution::Winner { ref winner, .. } if winner == "cabaret-2024"));
    }

    #[test]
    fn test_revival_flags_signal_free_losers_among_three() {
        let mut a = candidate("our-town-1988");
        a.has_text = true;
        let mut b = candidate("our-town-2002");
        b.has_score = true;
        b.has_text = true;
        let mut c = candidate("our-town-2024");
        c.has_score = true;

        // every production carries signal: nothing to flag
        let decision = resolve(&collision(vec![a.clone(), b.clone(), c.clone()]));
        assert_eq!(decision.tier, TierKind::Unresolved);

        let mut e = candidate("our-town-1969");
        e.opening_date = ymd(1969, 11, 27);
        let decision = resolve(&collision(vec![e, a, b, c]));
        assert_eq!(decision.tier, TierKind::Revival);
        assert_eq!(
            decision.resolution,
            Resolution::FlagLosers {
                losers: vec!["our-town-1969".to_string()]
            }
        );
    }

    #[test]
    fn test_double_bill_suppresses() {
        let mut a = candidate("tammy-faye-2024");
        a.opening_date = ymd(2024, 11, 14);
        a.has_score = true;
        let mut b = candidate("death-becomes-her-2024");
        b.opening_date = ymd(2024, 11, 21);

        let decision = resolve(&collision(vec![a, b]));
        assert_eq!(decision.tier, TierKind::NonRevival);
        assert_eq!(decision.resolution, Resolution::Suppress);
    }

    #[test]
    fn test_known_mapping_names_owner() {
        let mut wrong = candidate("sunset-blvd-2024");
        wrong.has_score = true;
        let mut right = candidate("sunset-boulevard-2024");
        right.has_score = true;

        let decision = resolve(&collision(vec![wrong, right]));
        assert_eq!(decision.tier, TierKind::KnownMapping);
        assert!(matches!(
            decision.resolution,
            Resolution::Winner { ref winner, .. } if winner == "sunset-boulevard-2024"
        ));
    }

    #[test]
    fn test_no_signal_nulls_url_at_low_confidence() {
        let decision = resolve(&collision(vec![candidate("a-2020"), candidate("b-2021")]));
        assert_eq!(decision.tier, TierKind::NoSignal);
        assert_eq!(decision.confidence, Confidence::Low);
        assert_eq!(decision.resolution, Resolution::NullUrl);
    }

    #[test]
    fn test_undecidable_collision_is_unresolved() {
        let mut a = candidate("a-2020");
        a.has_score = true;
        let mut b = candidate("b-2021");
        b.has_score = true;

        let decision = resolve(&collision(vec![a, b]));
        assert_eq!(decision.tier, TierKind::Unresolved);
        assert_eq!(decision.resolution, Resolution::Unresolved);
    }
}
