//! String similarity primitives
//!
//! Edit-distance ratio via `strsim`, plus the layered critic-name test.
//! Both are total over any pair of strings, including empty ones.

use crate::normalize::normalize_critic;

/// Default ratio above which two critic names are judged equal
pub const DEFAULT_NAME_SIMILARITY: f64 = 0.85;

/// Shortest normalized name that may match by containment
const MIN_CONTAINMENT_LEN: usize = 4;

/// `1 - editDistance(a, b) / max(len(a), len(b))` over chars
///
/// Empty vs empty is 1.0; one side empty is 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => strsim::normalized_levenshtein(a, b),
    }
}

/// Similarity of the first `max_chars` characters of each side, case-folded
pub fn prefix_similarity(a: &str, b: &str, max_chars: usize) -> f64 {
    let a = fold_prefix(a, max_chars);
    let b = fold_prefix(b, max_chars);
    similarity(&a, &b)
}

fn fold_prefix(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).flat_map(char::to_lowercase).collect()
}

/// Layered critic-name match with the default similarity threshold
pub fn names_match(a: &str, b: &str) -> bool {
    names_match_with(a, b, DEFAULT_NAME_SIMILARITY)
}

/// Layered critic-name match, checked in order:
/// 1. exact after normalization
/// 2. containment ("green" within "jesse green"), short strings excluded
/// 3. shared first token longer than 2 chars
/// 4. shared last token longer than 3 chars
/// 5. edit-distance ratio above `threshold`
pub fn names_match_with(a: &str, b: &str, threshold: f64) -> bool {
    let a = normalize_critic(a);
    let b = normalize_critic(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }

    if a == b {
        return true;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if shorter.chars().count() >= MIN_CONTAINMENT_LEN && longer.contains(shorter.as_str()) {
        return true;
    }

    let a_tokens: Vec<&str> = a.split(' ').collect();
    let b_tokens: Vec<&str> = b.split(' ').collect();

    if let (Some(first_a), Some(first_b)) = (a_tokens.first(), b_tokens.first()) {
        if first_a == first_b && first_a.chars().count() > 2 {
            return true;
        }
    }

    if let (Some(last_a), Some(last_b)) = (a_tokens.last(), b_tokens.last()) {
        if last_a == last_b && last_a.chars().count() > 3 {
            return true;
        }
    }

    similarity(&a, &b) > threshold
}
