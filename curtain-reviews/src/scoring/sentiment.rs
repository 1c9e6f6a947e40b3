//! Lexicon sentiment for review text
//!
//! Six keyword tiers, three positive and three negative, each with a
//! weight. Hits are whole-word/phrase matches over the lower-cased text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Confidence;

struct Tier {
    weight: f64,
    positive: bool,
    pattern: Regex,
}

fn tier(weight: f64, positive: bool, words: &[&str]) -> Tier {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Tier {
        weight,
        positive,
        pattern: Regex::new(&format!(r"\b(?:{})\b", alternation)).expect("static lexicon"),
    }
}

static TIERS: Lazy<Vec<Tier>> = Lazy::new(|| {
    vec![
        tier(
            2.0,
            true,
            &[
                "masterpiece",
                "triumph",
                "triumphant",
                "brilliant",
                "extraordinary",
                "stunning",
                "thrilling",
                "exhilarating",
                "transcendent",
                "must-see",
                "unmissable",
                "breathtaking",
                "sublime",
                "magnificent",
                "astonishing",
                "electrifying",
            ],
        ),
        tier(
            1.5,
            true,
            &[
                "excellent",
                "superb",
                "wonderful",
                "terrific",
                "marvelous",
                "delightful",
                "moving",
                "powerful",
                "gorgeous",
                "captivating",
                "riveting",
                "remarkable",
                "beautifully",
                "exquisite",
                "joyous",
            ],
        ),
        tier(
            1.0,
            true,
            &[
                "good",
                "enjoyable",
                "charming",
                "solid",
                "engaging",
                "entertaining",
                "funny",
                "fun",
                "pleasant",
                "worthwhile",
                "strong",
                "clever",
                "appealing",
                "affecting",
            ],
        ),
        tier(
            0.5,
            false,
            &[
                "uneven",
                "overlong",
                "flawed",
                "muddled",
                "thin",
                "slow",
                "sluggish",
                "predictable",
                "forgettable",
                "underwhelming",
                "mixed",
                "patchy",
            ],
        ),
        tier(
            1.5,
            false,
            &[
                "disappointing",
                "dull",
                "tedious",
                "lifeless",
                "bland",
                "misguided",
                "labored",
                "tiresome",
                "clumsy",
                "shrill",
                "flat",
                "weak",
            ],
        ),
        tier(
            2.0,
            false,
            &[
                "terrible",
                "awful",
                "disaster",
                "disastrous",
                "dreadful",
                "unbearable",
                "excruciating",
                "painful",
                "worst",
                "abysmal",
                "insufferable",
                "unwatchable",
                "fiasco",
            ],
        ),
    ]
});

/// Score bands on the positive ratio, highest first
const BANDS: &[(f64, u8)] = &[
    (0.85, 88),
    (0.75, 80),
    (0.62, 72),
    (0.50, 62),
    (0.38, 55),
    (0.22, 45),
];
const FLOOR_SCORE: u8 = 35;

/// Lexicon result for one text
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentScore {
    pub total_positive: f64,
    pub total_negative: f64,
    pub ratio: f64,
    pub score: u8,
    pub confidence: Confidence,
}

/// Weighted hit totals for a text
pub fn weigh(text: &str) -> (f64, f64) {
    let lowered = text.to_lowercase();
    TIERS.iter().fold((0.0, 0.0), |(pos, neg), tier| {
        let hits = tier.pattern.find_iter(&lowered).count() as f64 * tier.weight;
        if tier.positive {
            (pos + hits, neg)
        } else {
            (pos, neg + hits)
        }
    })
}

/// Band score for a positive ratio
pub fn band_score(ratio: f64) -> u8 {
    BANDS
        .iter()
        .find(|(floor, _)| ratio >= *floor)
        .map_or(FLOOR_SCORE, |(_, score)| *score)
}

/// Score a text; `None` when it is too short or no keyword matched
pub fn score_text(text: &str, min_chars: usize) -> Option<SentimentScore> {
    if text.trim().chars().count() < min_chars {
        return None;
    }

    let (total_positive, total_negative) = weigh(text);
    if total_positive == 0.0 && total_negative == 0.0 {
        return None;
    }

    let ratio = total_positive / (total_positive + total_negative + 0.1);
    let confidence = if (0.4..=0.6).contains(&ratio) {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    Some(SentimentScore {
        total_positive,
        total_negative,
        ratio,
        score: band_score(ratio),
        confidence,
    })
}
