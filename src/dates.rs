//! Publish-date normalization.
//!
//! Feeds disagree on how to write a date: RFC-822 (`Mon, 14 Apr 2025 10:00:00 GMT`),
//! bare `14 Apr 2025`, ISO-8601, US-style `Mar 12, 2025`, or something else
//! entirely. [`normalize_date`] walks an ordered table of `(regex, format)`
//! patterns and parses the first capture that yields a real calendar date.
//! When no pattern succeeds it falls back to whole-string structured parsers.
//!
//! # Pattern Order
//!
//! | # | Name | Example |
//! |---|------|---------|
//! | 1 | `rfc822` | `Mon, 14 Apr 2025 10:00:00 GMT` |
//! | 2 | `day-month-year` | `14 April 2025` |
//! | 3 | `iso8601` | `2025-04-14T10:00:00Z` |
//! | 4 | `month-day-year` | `Mar 12, 2025` |
//! | 5 | `slashed-iso` | `2025/04/14` |
//!
//! RFC-822 must stay ahead of the ISO pattern: some feeds append an ISO
//! "updated" stamp after the original publish date.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// A single date recognizer: the first capture group of `regex` is parsed with
/// each of `formats` in turn.
struct DatePattern {
    name: &'static str,
    regex: Regex,
    formats: &'static [&'static str],
}

impl DatePattern {
    fn new(name: &'static str, regex: &str, formats: &'static [&'static str]) -> Self {
        Self {
            name,
            regex: Regex::new(regex).expect("date pattern must compile"),
            formats,
        }
    }

    fn apply(&self, raw: &str) -> Option<NaiveDate> {
        let captured = self.regex.captures(raw)?.get(1)?.as_str();
        let tidy = tidy_capture(captured);
        let parsed = self
            .formats
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&tidy, format).ok());
        match parsed {
            Some(date) => trace!(pattern = self.name, %raw, %date, "Date pattern matched"),
            None => trace!(pattern = self.name, %raw, %tidy, "Date pattern matched but did not parse"),
        }
        parsed
    }
}

/// Abbreviated month first, then the full name.
const DAY_MONTH_YEAR: &[&str] = &["%d %b %Y", "%d %B %Y"];

static PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    vec![
        DatePattern::new(
            "rfc822",
            r"(?i)^\s*[a-z]{3},?\s+(\d{1,2}\s+[a-z]{3,9}\s+\d{4})",
            DAY_MONTH_YEAR,
        ),
        DatePattern::new(
            "day-month-year",
            r"(?i)\b(\d{1,2}\s+[a-z]{3,9}\.?\s+\d{4})\b",
            DAY_MONTH_YEAR,
        ),
        DatePattern::new("iso8601", r"\b(\d{4}-\d{2}-\d{2})", &["%Y-%m-%d"]),
        DatePattern::new(
            "month-day-year",
            r"(?i)\b([a-z]{3,9}\.?\s+\d{1,2},\s*\d{4})\b",
            &["%b %d, %Y", "%B %d, %Y"],
        ),
        DatePattern::new("slashed-iso", r"\b(\d{4}/\d{1,2}/\d{1,2})\b", &["%Y/%m/%d"]),
    ]
});

/// Whole-string layouts tried after every pattern failed.
const STRUCTURED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y%m%d", "%d.%m.%Y", "%B %d %Y"];

/// Parse a free-form publish date into a calendar date.
///
/// Returns `None` when nothing recognizable is found; this is an expected
/// outcome for irregular feeds and callers simply drop the entry.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_date("Mon, 14 Apr 2025 10:00:00 GMT"), NaiveDate::from_ymd_opt(2025, 4, 14));
/// assert_eq!(normalize_date("not a date"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    PATTERNS
        .iter()
        .find_map(|pattern| pattern.apply(raw))
        .or_else(|| parse_structured(raw))
}

fn parse_structured(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    for format in STRUCTURED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    trace!(%raw, "No date format recognized");
    None
}

/// Collapse whitespace, drop abbreviation dots and normalize the comma in
/// `Mon DD, YYYY` so the paired format sees one canonical spelling.
fn tidy_capture(captured: &str) -> String {
    captured
        .replace('.', "")
        .replace(',', ", ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
