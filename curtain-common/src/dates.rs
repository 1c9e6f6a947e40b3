//! Publish/opening date utilities
//!
//! Review feeds carry dates in many shapes ("2024-04-01", "April 1, 2024",
//! full RFC 3339 timestamps). Everything is reduced to a `NaiveDate`;
//! unparseable input yields `None`, never an error.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Formats tried in order after the ISO fast path
const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%b. %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
];

static URL_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/((?:19|20)\d{2})/").expect("static regex"));

/// Parse a date string as published by an aggregator feed
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Some(prefix) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Parse an optional date field
pub fn parse_optional_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

/// Extract a `/YYYY/` path segment from a URL
pub fn year_from_url(url: &str) -> Option<i32> {
    URL_YEAR_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `date` minus `months` calendar months (clamped to month end)
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_and_timestamps() {
        assert_eq!(parse_date("2024-04-01"), Some(ymd(2024, 4, 1)));
        assert_eq!(parse_date("2024-04-01T19:00:00Z"), Some(ymd(2024, 4, 1)));
        assert_eq!(parse_date("2024-04-01T19:00:00"), Some(ymd(2024, 4, 1)));
        assert_eq!(parse_date("2024-04-01 extra"), Some(ymd(2024, 4, 1)));
    }

    #[test]
    fn test_parse_long_forms() {
        assert_eq!(parse_date("April 1, 2024"), Some(ymd(2024, 4, 1)));
        assert_eq!(parse_date("Apr 1, 2024"), Some(ymd(2024, 4, 1)));
        assert_eq!(parse_date("04/01/2024"), Some(ymd(2024, 4, 1)));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("last Tuesday"), None);
        assert_eq!(parse_optional_date(None), None);
    }

    #[test]
    fn test_year_from_url() {
        assert_eq!(
            year_from_url("https://nytimes.com/2022/11/15/theater/review.html"),
            Some(2022)
        );
        assert_eq!(year_from_url("https://example.com/reviews/our-town"), None);
    }

    #[test]
    fn test_months_before_clamps() {
        assert_eq!(months_before(ymd(2024, 4, 1), 6), ymd(2023, 10, 1));
        assert_eq!(months_before(ymd(2024, 8, 31), 6), ymd(2024, 2, 29));
    }
}
