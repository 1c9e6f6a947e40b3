//! Explicit ratings: letter grades and star ratings → 1-100

use once_cell::sync::Lazy;
use regex::Regex;

/// Fixed letter table (12 points); F and anything else is not a grade here
const LETTER_SCORES: &[(&str, u8)] = &[
    ("A+", 97),
    ("A", 93),
    ("A-", 90),
    ("B+", 87),
    ("B", 83),
    ("B-", 80),
    ("C+", 77),
    ("C", 73),
    ("C-", 70),
    ("D+", 67),
    ("D", 63),
    ("D-", 60),
];

/// Scale assumed by "n stars" without an explicit maximum
const DEFAULT_STAR_SCALE: f64 = 5.0;

static TAIL_GRADE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?i:grade|rating)\s*:\s*|\n\s*)([A-D][+-]?)\s*$").expect("static regex")
});

static FIELD_GRADE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?i:grade|rating)\s*:\s*)?([A-D][+-]?)$").expect("static regex")
});

static STARS_OUT_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:/|out\s+of)\s*(\d+(?:\.\d+)?)(?:\s*stars?)?\s*$")
        .expect("static regex")
});

static STARS_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*stars?\s*$").expect("static regex"));

/// "Rating: 3.5/5" or "Grade: B+" closing a text
static LABELLED_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:grade|rating)\s*:\s*([^:\n]{1,20}?)\s*$").expect("static regex")
});

/// Unlabelled star forms that cannot be a date or a count: "4 out of 5", "3/5 stars", "★★★½"
static EXPLICIT_STARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\d+(?:\.\d+)?\s*out\s+of\s*\d+(?:\.\d+)?(?:\s*stars?)?|\d+(?:\.\d+)?(?:\s*/\s*\d+(?:\.\d+)?)?\s*stars?|[★☆½]+)\s*$",
    )
    .expect("static regex")
});

/// Score for a letter grade ("B+" → 87)
pub fn letter_score(grade: &str) -> Option<u8> {
    let grade = grade.trim();
    LETTER_SCORES
        .iter()
        .find(|(letter, _)| *letter == grade)
        .map(|(_, score)| *score)
}

/// Scale `value` out of `max` to 1-100
fn scale(value: f64, max: f64) -> Option<u8> {
    if !(max > 0.0) || value < 0.0 || value > max {
        return None;
    }
    let scaled = (value / max * 100.0).round().clamp(1.0, 100.0);
    Some(scaled as u8)
}

/// Star rating as written ("3.5/5", "4 out of 5", "4 stars", "★★★½")
pub fn star_score(raw: &str) -> Option<u8> {
    let raw = raw.trim();

    if let Some(caps) = STARS_OUT_OF_RE.captures(raw) {
        let value: f64 = caps[1].parse().ok()?;
        let max: f64 = caps[2].parse().ok()?;
        return scale(value, max);
    }
    if let Some(caps) = STARS_COUNT_RE.captures(raw) {
        let value: f64 = caps[1].parse().ok()?;
        return scale(value, DEFAULT_STAR_SCALE);
    }

    let glyphs: f64 = raw
        .chars()
        .map(|c| match c {
            '★' => 1.0,
            '½' => 0.5,
            _ => 0.0,
        })
        .sum();
    if glyphs > 0.0 && raw.chars().all(|c| matches!(c, '★' | '☆' | '½') || c.is_whitespace()) {
        return scale(glyphs, DEFAULT_STAR_SCALE);
    }
    None
}

/// Rating field as supplied by a source: a grade or a star rating
pub fn parse_rating_field(raw: &str) -> Option<(u8, String)> {
    let trimmed = raw.trim();
    if let Some(caps) = FIELD_GRADE_RE.captures(trimmed) {
        let grade = &caps[1];
        return letter_score(grade).map(|s| (s, format!("grade {}", grade)));
    }
    star_score(trimmed).map(|s| (s, format!("rating {}", trimmed)))
}

/// Grade or star rating at the very end of a review text
///
/// A bare letter is only read from the last `tail_chars` characters. A
/// star rating needs a "Rating:"/"Grade:" label or an explicit star form,
/// so a closing line such as "Closes 5/26" is never taken for a verdict.
pub fn parse_text_tail(text: &str, tail_chars: usize) -> Option<(u8, String)> {
    let trimmed = text.trim_end();
    let total = trimmed.chars().count();
    let tail_start = trimmed
        .char_indices()
        .nth(total.saturating_sub(tail_chars))
        .map_or(0, |(i, _)| i);
    let tail = &trimmed[tail_start..];

    if let Some(caps) = TAIL_GRADE_RE.captures(tail) {
        let grade = &caps[1];
        return letter_score(grade).map(|s| (s, format!("grade {} at end of text", grade)));
    }

    if let Some(caps) = LABELLED_TAIL_RE.captures(trimmed) {
        let value = caps[1].trim();
        if let Some(score) = star_score(value) {
            return Some((score, format!("rating {} at end of text", value)));
        }
    }

    let stars = EXPLICIT_STARS_RE.find(trimmed)?.as_str().trim();
    star_score(stars).map(|s| (s, format!("rating {} at end of text", stars)))
}
