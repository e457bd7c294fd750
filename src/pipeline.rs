//! Raw entries in, dated and cleaned records out.
//!
//! | Step | Effect |
//! |------|--------|
//! | 1 | normalize `published_raw`; entries whose date does not parse are dropped |
//! | 2 | keep `today - window_days <= date <= today` |
//! | 3 | stable sort by date, newest first |
//! | 4 | strip markup from the description and cap its length |
//! | 5 | pick the image: explicit `image_raw`, else [`resolve_image`] |
//!
//! [`Pipeline::run`] depends only on its input and `today`, so running it
//! twice over the same entries gives identical output.

use crate::config::AppConfig;
use crate::dates::normalize_date;
use crate::images::resolve_image;
use crate::markup::{DESCRIPTION_CAP, clean_markup};
use crate::models::{NormalizedRecord, RawEntry};
use crate::scrapers::{SourceFailure, SourceFetcher};
use crate::scrapers::batch::fetch_all;
use chrono::{Days, NaiveDate};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    pub window_days: u32,
    pub description_cap: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(7)
    }
}

/// Records from one full fetch cycle plus the sources that failed.
#[derive(Debug, Default)]
pub struct Refresh {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<SourceFailure>,
}

impl Pipeline {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days,
            description_cap: DESCRIPTION_CAP,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            window_days: config.window_days,
            description_cap: config.description_cap,
        }
    }

    /// First day still inside the window ending on `today`.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Turn raw entries into records ordered newest first.
    #[instrument(level = "info", skip_all, fields(raw = raw.len(), %today, window_days = self.window_days))]
    pub fn run(&self, raw: Vec<RawEntry>, today: NaiveDate) -> Vec<NormalizedRecord> {
        let start = self.window_start(today);

        let mut unparsable = 0usize;
        let mut outside = 0usize;
        let mut dated: Vec<(NaiveDate, RawEntry)> = Vec::with_capacity(raw.len());
        for entry in raw {
            let Some(date) = normalize_date(&entry.published_raw) else {
                unparsable += 1;
                debug!(title = %entry.title, raw = %entry.published_raw, "Dropping entry with unparsable date");
                continue;
            };
            if date < start || date > today {
                outside += 1;
                continue;
            }
            dated.push((date, entry));
        }

        // `sort_by` is stable: equal dates keep their fetch order.
        dated.sort_by(|a, b| b.0.cmp(&a.0));

        let records: Vec<NormalizedRecord> = dated
            .into_iter()
            .map(|(date, entry)| self.finish(date, entry))
            .collect();

        info!(
            kept = records.len(),
            unparsable,
            outside_window = outside,
            "Pipeline complete"
        );
        records
    }

    /// [`run`](Self::run), but a panic anywhere inside yields an empty result.
    pub fn run_guarded(&self, raw: Vec<RawEntry>, today: NaiveDate) -> Vec<NormalizedRecord> {
        match catch_unwind(AssertUnwindSafe(|| self.run(raw, today))) {
            Ok(records) => records,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(%reason, "Pipeline failed; returning no records");
                Vec::new()
            }
        }
    }

    fn finish(&self, date: NaiveDate, entry: RawEntry) -> NormalizedRecord {
        let image = entry
            .image_raw
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| resolve_image(&entry.media, &entry.description_raw));

        NormalizedRecord {
            description: clean_markup(&entry.description_raw, self.description_cap),
            title: entry.title,
            link: entry.link,
            source: entry.source,
            date,
            image,
        }
    }
}

/// Fetch every configured source and run the result through the pipeline.
#[instrument(level = "info", skip_all, fields(%today))]
pub async fn refresh_records<F: SourceFetcher>(
    fetcher: &F,
    config: &AppConfig,
    today: NaiveDate,
) -> Refresh {
    let report = fetch_all(
        fetcher,
        &config.feeds,
        config.scrape.as_ref(),
        &config.fetch_settings(),
    )
    .await;

    for failure in &report.failures {
        warn!(source = %failure.source, url = %failure.url, reason = %failure.reason, "Source skipped");
    }

    let records = Pipeline::from_config(config).run_guarded(report.entries, today);
    if records.is_empty() {
        warn!(failed = report.failures.len(), "No data available after refresh");
    }

    Refresh {
        records,
        failures: report.failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedSource, ScrapeTarget};
    use crate::models::MediaFields;
    use crate::scrapers::FetchError;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    fn entry(title: &str, published: &str) -> RawEntry {
        RawEntry {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            published_raw: published.to_string(),
            description_raw: format!("<p>About {title}</p>"),
            ..RawEntry::placeholder("Example")
        }
    }

    fn titles(records: &[NormalizedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_window_is_inclusive_at_both_ends() {
        let raw = vec![
            entry("future", "2025-04-11"),
            entry("today", "2025-04-10"),
            entry("edge", "2025-04-03"),
            entry("stale", "2025-04-02"),
        ];
        let records = Pipeline::new(7).run(raw, today());
        assert_eq!(titles(&records), vec!["today", "edge"]);
    }

    #[test]
    fn test_drops_unparsable_dates() {
        let raw = vec![
            entry("good", "Wed, 09 Apr 2025 10:00:00 GMT"),
            entry("missing", crate::models::NO_DATE),
            entry("garbage", "yesterday-ish"),
        ];
        let records = Pipeline::default().run(raw, today());
        assert_eq!(titles(&records), vec!["good"]);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2025, 4, 9).unwrap());
    }

    #[test]
    fn test_sorted_descending_and_ties_stay_stable() {
        let raw = vec![
            entry("a", "2025-04-05"),
            entry("b", "2025-04-09"),
            entry("c", "Apr 5, 2025"),
            entry("d", "2025-04-09T08:00:00Z"),
            entry("e", "2025-04-07"),
        ];
        let records = Pipeline::default().run(raw, today());
        assert_eq!(titles(&records), vec!["b", "d", "e", "a", "c"]);
        assert!(records.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_descriptions_are_cleaned_and_capped() {
        let mut long = entry("long", "2025-04-09");
        long.description_raw = format!("<div>{}\n{}</div>", "x".repeat(400), "y".repeat(400));
        let records = Pipeline::default().run(vec![long, entry("short", "2025-04-09")], today());

        assert_eq!(records[0].description.chars().count(), 500);
        assert!(!records[0].description.contains('\n'));
        assert!(!records[0].description.contains('<'));
        assert_eq!(records[1].description, "About short");
    }

    #[test]
    fn test_image_only_description_leaves_no_markup() {
        let mut card = entry("card", "2025-04-09");
        card.description_raw =
            r#"<a href="https://x"><img src="https://cdn.example.com/a.png"/></a>"#.to_string();
        let records = Pipeline::default().run(vec![card], today());

        assert_eq!(records[0].description, "");
        assert_eq!(records[0].image.as_deref(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_explicit_image_wins_over_resolved() {
        let mut explicit = entry("explicit", "2025-04-09");
        explicit.image_raw = Some("https://img.example.com/explicit.png".to_string());
        explicit.media.media_content = Some("https://img.example.com/media.png".to_string());

        let mut resolved = entry("resolved", "2025-04-09");
        resolved.image_raw = Some("   ".to_string());
        resolved.media = MediaFields {
            media_thumbnail: Some("https://img.example.com/thumb.png".to_string()),
            ..MediaFields::default()
        };

        let bare = entry("bare", "2025-04-09");

        let records = Pipeline::default().run(vec![explicit, resolved, bare], today());
        assert_eq!(records[0].image.as_deref(), Some("https://img.example.com/explicit.png"));
        assert_eq!(records[1].image.as_deref(), Some("https://img.example.com/thumb.png"));
        assert_eq!(records[2].image, None);
    }

    #[test]
    fn test_run_is_idempotent() {
        let raw = vec![
            entry("one", "2025-04-08"),
            entry("two", "Tue, 08 Apr 2025 09:00:00 +0000"),
            entry("three", "2025/04/06"),
        ];
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.run(raw.clone(), today()), pipeline.run(raw, today()));
    }

    #[test]
    fn test_window_length_is_configurable() {
        let raw = vec![entry("recent", "2025-04-09"), entry("older", "2025-04-01")];
        assert_eq!(Pipeline::new(1).run(raw.clone(), today()).len(), 1);
        assert_eq!(Pipeline::new(30).run(raw, today()).len(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        assert!(Pipeline::default().run_guarded(Vec::new(), today()).is_empty());
    }

    struct StaticFetcher;

    impl SourceFetcher for StaticFetcher {
        async fn fetch_feed(&self, feed: &FeedSource) -> Result<Vec<RawEntry>, FetchError> {
            if feed.label == "Down" {
                return Err("503 Service Unavailable".into());
            }
            Ok(vec![RawEntry {
                source: feed.label.clone(),
                ..entry(&feed.label, "2025-04-08")
            }])
        }

        async fn fetch_page(&self, target: &ScrapeTarget) -> Result<Vec<RawEntry>, FetchError> {
            Ok(vec![RawEntry {
                source: target.label.clone(),
                ..entry("page", "2025-04-09")
            }])
        }
    }

    #[tokio::test]
    async fn test_refresh_runs_fetch_and_pipeline() {
        let config = AppConfig {
            feeds: vec![
                FeedSource::new("https://a.example.com/feed", "Alpha"),
                FeedSource::new("https://down.example.com/feed", "Down"),
            ],
            ..AppConfig::default()
        };
        let refresh = refresh_records(&StaticFetcher, &config, today()).await;

        assert_eq!(titles(&refresh.records), vec!["page", "Alpha"]);
        assert_eq!(refresh.failures.len(), 1);
        assert_eq!(refresh.failures[0].source, "Down");
    }
}
