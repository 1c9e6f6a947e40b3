//! Garbage full-text detection
//!
//! Scrapers sometimes store an error page, paywall or bot check in place
//! of the review. Such text is nulled before merging so a short error page
//! never beats a real excerpt, and never feeds the sentiment scorer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::ResolverThresholds;
use crate::models::ReviewRecord;

/// Phrases only found on error, paywall and bot-check pages
const ERROR_PHRASES: &[&str] = &[
    "page not found",
    "404 not found",
    "error 404",
    "this page doesn't exist",
    "this page does not exist",
    "subscribe to continue",
    "subscribe to read",
    "to continue reading",
    "already a subscriber",
    "access denied",
    "enable javascript",
    "please enable cookies",
    "verify you are human",
    "are you a robot",
    "checking your browser",
    "403 forbidden",
];

/// Navigation and footer tokens that make up boilerplate-only pages
const BOILERPLATE_TOKENS: &[&str] = &[
    "sign in",
    "log in",
    "newsletter",
    "privacy policy",
    "terms of use",
    "cookies",
    "cookie",
    "all rights reserved",
    "advertisement",
    "share this",
    "follow us",
    "menu",
    "search",
];

const MIN_BOILERPLATE_TOKENS: usize = 2;

/// Share of the letters and digits the tokens must account for
const MIN_BOILERPLATE_COVERAGE: f64 = 0.6;

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = BOILERPLATE_TOKENS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).expect("static regex")
});

fn alphanumeric_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Distinct boilerplate tokens in `text`, if they make up most of it
fn boilerplate_tokens(text: &str) -> Option<Vec<String>> {
    let mut tokens = BTreeSet::new();
    let mut covered = 0;
    for m in BOILERPLATE_RE.find_iter(text) {
        tokens.insert(m.as_str().to_lowercase());
        covered += alphanumeric_count(m.as_str());
    }
    let total = alphanumeric_count(text);
    let coverage = if total == 0 { 0.0 } else { covered as f64 / total as f64 };
    (tokens.len() >= MIN_BOILERPLATE_TOKENS && coverage >= MIN_BOILERPLATE_COVERAGE)
        .then(|| tokens.into_iter().collect())
}

/// Why a text was judged garbage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GarbageVerdict {
    pub phrase: String,
}

impl GarbageVerdict {
    pub fn reason(&self) -> String {
        format!("garbage text: {}", self.phrase)
    }
}

pub struct GarbageTextDetector {
    max_chars: usize,
    boilerplate_max_chars: usize,
}

impl GarbageTextDetector {
    pub fn new(thresholds: &ResolverThresholds) -> Self {
        Self {
            max_chars: thresholds.garbage_max_chars,
            boilerplate_max_chars: thresholds.boilerplate_max_chars,
        }
    }

    /// Judge a text; long texts are never garbage
    pub fn check(&self, text: &str) -> Option<GarbageVerdict> {
        let length = text.trim().chars().count();
        if length == 0 || length >= self.max_chars {
            return None;
        }

        let lowered = text.to_lowercase();
        if let Some(phrase) = ERROR_PHRASES.iter().find(|p| lowered.contains(*p)) {
            return Some(GarbageVerdict {
                phrase: (*phrase).to_string(),
            });
        }

        if length >= self.boilerplate_max_chars {
            return None;
        }
        boilerplate_tokens(text).map(|tokens| GarbageVerdict {
            phrase: format!("boilerplate ({})", tokens.join(", ")),
        })
    }

    /// Null garbage full text, recording why; returns the verdict if changed
    pub fn clean(&self, record: &mut ReviewRecord) -> Option<GarbageVerdict> {
        let verdict = self.check(record.full_text.as_deref()?)?;
        record.full_text = None;
        record.garbage_text_reason = Some(verdict.reason());
        Some(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> GarbageTextDetector {
        GarbageTextDetector::new(&ResolverThresholds::default())
    }

    #[test]
    fn test_error_pages_are_garbage() {
        let verdict = detector()
            .check("Oops! Page Not Found. The page you requested could not be located.")
            .unwrap();
        assert_eq!(verdict.phrase, "page not found");
        assert_eq!(verdict.reason(), "garbage text: page not found");

        assert!(detector()
            .check("Subscribe to continue reading this article.")
            .is_some());
    }

    #[test]
    fn test_short_navigation_page_is_garbage() {
        let verdict = detector().check("Menu  Search  Sign In  Newsletter").unwrap();
        assert_eq!(verdict.phrase, "boilerplate (menu, newsletter, search, sign in)");

        assert!(detector()
            .check("Advertisement | Share this | Follow us | Privacy Policy | All rights reserved")
            .is_some());
    }

    #[test]
    fn test_short_review_using_navigation_words_is_kept() {
        let review = "A search for meaning, served from a menu of old standards; Ms. Rankin sells every one.";
        assert!(detector().check(review).is_none());

        // Tokens inside longer words do not count
        assert!(detector().check("Researched menus, logins and cookiecutter plots").is_none());
    }

    #[test]
    fn test_real_review_is_kept() {
        let review = "Eddie Redmayne's Emcee is a feral, unsettling creation, and Rebecca \
                      Frecknall's staging turns the August Wilson into a club you cannot leave.";
        assert!(detector().check(review).is_none());

        // long text that quotes an error phrase is still a review
        let long = format!("{} Someone shouts 'access denied' in act two.", "word ".repeat(400));
        assert!(detector().check(&long).is_none());
    }

    #[test]
    fn test_clean_nulls_text_once() {
        let mut record = ReviewRecord {
            full_text: Some("403 Forbidden".to_string()),
            ..Default::default()
        };
        assert!(detector().clean(&mut record).is_some());
        assert!(record.full_text.is_none());
        assert_eq!(record.garbage_text_reason.as_deref(), Some("garbage text: 403 forbidden"));
        assert!(detector().clean(&mut record).is_none());
    }
}
