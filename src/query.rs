//! Read-only projections over a record set.

use crate::models::NormalizedRecord;
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Optional date bounds (both inclusive) and a source allow-list.
///
/// An empty `sources` list means "every source".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub sources: Vec<String>,
}

impl NewsQuery {
    /// Split a comma-separated source list, ignoring blank items.
    pub fn parse_sources(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        self.start.is_none_or(|start| record.date >= start)
            && self.end.is_none_or(|end| record.date <= end)
            && (self.sources.is_empty() || self.sources.iter().any(|s| *s == record.source))
    }
}

/// Records matching `q`, newest first. Records sharing a date keep their
/// input order.
pub fn query(records: &[NormalizedRecord], q: &NewsQuery) -> Vec<NormalizedRecord> {
    records
        .iter()
        .filter(|r| q.matches(r))
        .sorted_by(|a, b| b.date.cmp(&a.date))
        .cloned()
        .collect()
}

/// Sorted distinct source labels present in `records`.
pub fn available_sources(records: &[NormalizedRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.source.clone())
        .sorted()
        .dedup()
        .collect()
}

/// Default dashboard range: the last `span_days` up to the newest record,
/// clamped to the oldest record. `None` for an empty set.
pub fn default_range(records: &[NormalizedRecord], span_days: u32) -> Option<(NaiveDate, NaiveDate)> {
    let (min, max) = records
        .iter()
        .map(|r| r.date)
        .minmax()
        .into_option()?;
    let start = max
        .checked_sub_days(Days::new(u64::from(span_days)))
        .map_or(min, |d| d.max(min));
    Some((start, max))
}
