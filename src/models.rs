//! Data models for feed entries and their normalized representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawEntry`]: An entry as produced by a feed or page scraper, untouched
//! - [`MediaFields`]: Structured media attachments carried by a feed entry
//! - [`NormalizedRecord`]: A dated, cleaned entry ready for querying
//! - [`NewsItem`]: The presentation view handed to the JSON, Markdown and HTTP outputs
//! - [`Digest`]: One serialized output run

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a feed entry carries none.
pub const NO_TITLE: &str = "No Title";
/// Link used when a feed entry carries none.
pub const NO_LINK: &str = "No Link";
/// Published value used when a feed entry carries none. Never parses as a date.
pub const NO_DATE: &str = "No Date";
/// Description used when a feed entry carries none.
pub const NO_DESCRIPTION: &str = "No Description";

/// Structured media attachments declared by a feed entry.
///
/// All fields are optional; most feeds populate at most one of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaFields {
    /// URL of the first `<media:content>` element.
    pub media_content: Option<String>,
    /// URL of the first `<media:thumbnail>` element.
    pub media_thumbnail: Option<String>,
    /// Every `<enclosure>` as a `(url, mime type)` pair, in document order.
    pub enclosures: Vec<(String, String)>,
}

/// A feed entry exactly as a source produced it.
///
/// Nothing is cleaned or validated here; `published_raw` may be any string
/// and `description_raw` may contain arbitrary (even escaped) HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub published_raw: String,
    pub description_raw: String,
    /// Display label of the configured source this entry came from.
    pub source: String,
    /// Image supplied directly by the source (the scraper path sets this).
    pub image_raw: Option<String>,
    pub media: MediaFields,
}

impl RawEntry {
    /// Build an entry with the placeholder values used for missing feed fields.
    pub fn placeholder(source: &str) -> Self {
        Self {
            title: NO_TITLE.to_string(),
            link: NO_LINK.to_string(),
            published_raw: NO_DATE.to_string(),
            description_raw: NO_DESCRIPTION.to_string(),
            source: source.to_string(),
            image_raw: None,
            media: MediaFields::default(),
        }
    }
}

/// A dated, cleaned entry.
///
/// Every record has a valid `date`, and `description` is free of markup and
/// newlines and bounded in length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub link: String,
    pub source: String,
    /// Calendar date of publication, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub description: String,
    pub image: Option<String>,
}

/// A record formatted for display.
///
/// The description is shortened for cards and the image always has a value:
/// the configured placeholder stands in when no image was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub source: String,
    pub date: String,
    pub image: String,
}

impl NewsItem {
    /// Maximum number of description characters shown on a card.
    pub const DESCRIPTION_PREVIEW: usize = 150;

    /// Format a record, substituting `placeholder_image` when it has no image.
    pub fn from_record(record: &NormalizedRecord, placeholder_image: &str) -> Self {
        let description = if record.description.chars().count() > Self::DESCRIPTION_PREVIEW {
            let head: String = record
                .description
                .chars()
                .take(Self::DESCRIPTION_PREVIEW)
                .collect();
            format!("{head}...")
        } else {
            record.description.clone()
        };

        let image = record
            .image
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(placeholder_image)
            .to_string();

        Self {
            title: record.title.clone(),
            description,
            link: record.link.clone(),
            source: record.source.clone(),
            date: record.date.format("%Y-%m-%d").to_string(),
            image,
        }
    }
}

/// The filters applied to produce a [`Digest`], echoed back for readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sources: Vec<String>,
}

/// The result of one `fetch` run, written as JSON and Markdown.
#[derive(Debug, Serialize, Deserialize)]
pub struct Digest {
    /// UTC instant the run finished fetching.
    pub generated_at: DateTime<Utc>,
    /// Trailing window length the pipeline used.
    pub window_days: u32,
    pub query: DigestQuery,
    pub items: Vec<NewsItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(description: &str, image: Option<&str>) -> NormalizedRecord {
        NormalizedRecord {
            title: "Scaling laws revisited".to_string(),
            link: "https://example.com/scaling".to_string(),
            source: "OpenAI News".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
            description: description.to_string(),
            image: image.map(str::to_string),
        }
    }

    #[test]
    fn test_placeholder_entry_defaults() {
        let entry = RawEntry::placeholder("META Research");
        assert_eq!(entry.title, "No Title");
        assert_eq!(entry.link, "No Link");
        assert_eq!(entry.published_raw, "No Date");
        assert_eq!(entry.description_raw, "No Description");
        assert_eq!(entry.source, "META Research");
        assert!(entry.image_raw.is_none());
        assert_eq!(entry.media, MediaFields::default());
    }

    #[test]
    fn test_news_item_short_description_untouched() {
        let item = NewsItem::from_record(&record("Short summary.", None), "placeholder.jpg");
        assert_eq!(item.description, "Short summary.");
        assert_eq!(item.date, "2025-04-14");
    }

    #[test]
    fn test_news_item_long_description_shortened() {
        let long = "x".repeat(200);
        let item = NewsItem::from_record(&record(&long, None), "placeholder.jpg");
        assert_eq!(item.description, format!("{}...", "x".repeat(150)));
    }

    #[test]
    fn test_news_item_placeholder_image() {
        let item = NewsItem::from_record(&record("d", None), "placeholder.jpg");
        assert_eq!(item.image, "placeholder.jpg");

        let blank = NewsItem::from_record(&record("d", Some("  ")), "placeholder.jpg");
        assert_eq!(blank.image, "placeholder.jpg");

        let real = NewsItem::from_record(
            &record("d", Some("https://cdn.example.com/a.png")),
            "placeholder.jpg",
        );
        assert_eq!(real.image, "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_record_serializes_iso_date() {
        let json = serde_json::to_string(&record("d", None)).unwrap();
        assert!(json.contains("\"date\":\"2025-04-14\""));

        let back: NormalizedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, NaiveDate::from_ymd_opt(2025, 4, 14).unwrap());
    }
}
