//! Field-level merge policy
//!
//! Applied left to right as sightings arrive. A populated field is only
//! replaced by a strictly better value:
//! - url, date, ratings, score: first non-null wins
//! - per-source excerpts: first non-null per field
//! - full text: the longer string (ties keep the earlier)
//! - critic name: a real byline replaces a placeholder
//! - provenance: union of source names

use crate::models::ReviewRecord;
use crate::normalize::is_unknown_critic;

/// Merge `incoming` into `target` in place
pub fn merge_into(target: &mut ReviewRecord, incoming: &ReviewRecord) {
    fill_str(&mut target.url, &incoming.url);
    fill_str(&mut target.outlet, &incoming.outlet);
    fill_str(&mut target.publish_date, &incoming.publish_date);

    fill_str(&mut target.dtli_excerpt, &incoming.dtli_excerpt);
    fill_str(&mut target.bww_excerpt, &incoming.bww_excerpt);
    fill_str(&mut target.show_score_excerpt, &incoming.show_score_excerpt);

    fill_str(&mut target.dtli_thumb, &incoming.dtli_thumb);
    fill_str(&mut target.bww_thumb, &incoming.bww_thumb);
    fill_str(&mut target.original_rating, &incoming.original_rating);
    fill_str(&mut target.designation, &incoming.designation);
    if target.ensemble_score.is_none() {
        target.ensemble_score = incoming.ensemble_score.clone();
    }

    // Score travels with its source and confidence
    if target.assigned_score.is_none() && incoming.assigned_score.is_some() {
        target.assigned_score = incoming.assigned_score;
        target.score_source = incoming.score_source;
        target.score_confidence = incoming.score_confidence;
        target.score_status = None;
    }

    if is_unknown_critic(target.critic_name.as_deref())
        && !is_unknown_critic(incoming.critic_name.as_deref())
    {
        target.critic_name = incoming.critic_name.clone();
    }

    if let Some(incoming_text) = incoming.text() {
        let current_len = target.text().map_or(0, |t| t.chars().count());
        if incoming_text.chars().count() > current_len {
            target.full_text = Some(incoming_text.to_string());
        }
    }

    let mut provenance = target.provenance();
    provenance.extend(incoming.provenance());
    target.sources = provenance.into_iter().collect();

    for (key, value) in &incoming.extra {
        target
            .extra
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
}

fn fill_str(target: &mut Option<String>, incoming: &Option<String>) {
    let target_empty = target.as_deref().map_or(true, |t| t.trim().is_empty());
    let incoming_present = incoming.as_deref().is_some_and(|i| !i.trim().is_empty());
    if target_empty && incoming_present {
        *target = incoming.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreSource;

    fn sighting(source: &str) -> ReviewRecord {
        ReviewRecord {
            show_id: "hair-2011".to_string(),
            outlet: Some("NYT".to_string()),
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_non_null_wins() {
        let mut a = sighting("dtli");
        a.url = Some("https://nytimes.com/a".to_string());
        let mut b = sighting("bww");
        b.url = Some("https://nytimes.com/b".to_string());
        b.publish_date = Some("2011-03-06".to_string());

        merge_into(&mut a, &b);
        assert_eq!(a.url.as_deref(), Some("https://nytimes.com/a"));
        assert_eq!(a.publish_date.as_deref(), Some("2011-03-06"));
    }

    #[test]
    fn test_blank_string_counts_as_missing() {
        let mut a = sighting("dtli");
        a.url = Some("  ".to_string());
        let mut b = sighting("bww");
        b.url = Some("https://nytimes.com/b".to_string());

        merge_into(&mut a, &b);
        assert_eq!(a.url.as_deref(), Some("https://nytimes.com/b"));
    }

    #[test]
    fn test_longer_full_text_wins_ties_keep_earlier() {
        let mut a = sighting("dtli");
        a.full_text = Some("short".to_string());
        let mut b = sighting("bww");
        b.full_text = Some("much longer text".to_string());
        merge_into(&mut a, &b);
        assert_eq!(a.full_text.as_deref(), Some("much longer text"));

        let mut c = sighting("show-score");
        c.full_text = Some("same length text".to_string());
        merge_into(&mut a, &c);
        assert_eq!(a.full_text.as_deref(), Some("much longer text"));
    }

    #[test]
    fn test_excerpts_are_independent() {
        let mut a = sighting("dtli");
        a.dtli_excerpt = Some("from dtli".to_string());
        let mut b = sighting("bww");
        b.dtli_excerpt = Some("other dtli".to_string());
        b.bww_excerpt = Some("from bww".to_string());

        merge_into(&mut a, &b);
        assert_eq!(a.dtli_excerpt.as_deref(), Some("from dtli"));
        assert_eq!(a.bww_excerpt.as_deref(), Some("from bww"));
    }

    #[test]
    fn test_score_moves_with_its_source() {
        let mut a = sighting("dtli");
        let mut b = sighting("bww");
        b.assigned_score = Some(85);
        b.score_source = Some(ScoreSource::Thumb);

        merge_into(&mut a, &b);
        assert_eq!(a.assigned_score, Some(85));
        assert_eq!(a.score_source, Some(ScoreSource::Thumb));
    }

    #[test]
    fn test_real_byline_replaces_placeholder() {
        let mut a = sighting("dtli");
        a.critic_name = Some("Staff".to_string());
        let mut b = sighting("bww");
        b.critic_name = Some("Ben Brantley".to_string());

        merge_into(&mut a, &b);
        assert_eq!(a.critic_name.as_deref(), Some("Ben Brantley"));

        let mut c = sighting("show-score");
        c.critic_name = Some("B. Brantley".to_string());
        merge_into(&mut a, &c);
        assert_eq!(a.critic_name.as_deref(), Some("Ben Brantley"));
    }

    #[test]
    fn test_provenance_union() {
        let mut a = sighting("dtli");
        let b = sighting("bww");
        merge_into(&mut a, &b);
        merge_into(&mut a, &b);
        assert_eq!(a.sources, vec!["bww".to_string(), "dtli".to_string()]);
        assert_eq!(a.source.as_deref(), Some("dtli"));
    }
}
