//! Runtime configuration.
//!
//! Everything the pipeline needs from the outside world lives in
//! [`AppConfig`]: the feed list with display labels, the scrape target, the
//! trailing window, concurrency and timeout limits, and presentation
//! settings. It is loaded once (from YAML, or built-in defaults) and passed
//! explicitly to the components that need it.
//!
//! # Example
//!
//! ```yaml
//! window_days: 30
//! max_concurrency: 10
//! fetch_timeout_secs: 20
//! feeds:
//!   - url: https://openai.com/news/rss.xml
//!     label: OpenAI News
//! scrape:
//!   url: https://www.deeplearning.ai/the-batch/
//!   label: deeplearning.ai
//!   article: article
//!   title: h2
//!   link: a[href]
//!   date: time
//!   summary: p
//!   image: img
//! ```
//!
//! Omitted keys take their default values.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

use crate::markup::DESCRIPTION_CAP;

/// Online fallback used when an entry has no image.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://img.freepik.com/free-vector/artificial-intelligence-ai-robot-server-room-digital-technology-banner_39422-794.jpg";

/// One syndication feed and the label shown for its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub label: String,
}

impl FeedSource {
    pub fn new(url: &str, label: &str) -> Self {
        Self {
            url: url.to_string(),
            label: label.to_string(),
        }
    }
}

/// An HTML page listing articles as repeated blocks.
///
/// Every selector except `article` is evaluated relative to one article block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeTarget {
    pub url: String,
    pub label: String,
    /// Selector for the repeated article block.
    pub article: String,
    pub title: String,
    pub link: String,
    pub date: String,
    pub summary: String,
    pub image: String,
}

impl Default for ScrapeTarget {
    fn default() -> Self {
        Self {
            url: "https://www.deeplearning.ai/the-batch/".to_string(),
            label: "deeplearning.ai".to_string(),
            article: "article".to_string(),
            title: "h2, h3".to_string(),
            link: "a[href]".to_string(),
            date: "time, .date".to_string(),
            summary: "p".to_string(),
            image: "img".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Length of the trailing window, in days.
    pub window_days: u32,
    /// Maximum number of feed fetches in flight at once.
    pub max_concurrency: usize,
    /// Per-fetch timeout, in seconds.
    pub fetch_timeout_secs: u64,
    /// Maximum cleaned description length, in characters.
    pub description_cap: usize,
    pub placeholder_image: String,
    /// How long the API keeps a fetched record set, in seconds.
    pub cache_ttl_secs: u64,
    pub feeds: Vec<FeedSource>,
    pub scrape: Option<ScrapeTarget>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            max_concurrency: 10,
            fetch_timeout_secs: 20,
            description_cap: DESCRIPTION_CAP,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            cache_ttl_secs: 60,
            feeds: default_feeds(),
            scrape: Some(ScrapeTarget::default()),
        }
    }
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "https://bair.berkeley.edu/blog/feed.xml",
            "The Berkeley Artificial Intelligence Research Blog",
        ),
        FeedSource::new("https://feeds.feedburner.com/nvidiablog", "NVIDIA Blog"),
        FeedSource::new("https://www.microsoft.com/en-us/research/feed/", "Microsoft Research"),
        FeedSource::new(
            "https://www.sciencedaily.com/rss/computers_math/artificial_intelligence.xml",
            "Science Daily",
        ),
        FeedSource::new("https://research.facebook.com/feed/", "META Research"),
        FeedSource::new("https://openai.com/news/rss.xml", "OpenAI News"),
        FeedSource::new("https://deepmind.google/blog/feed/basic/", "Google DeepMind Blog"),
    ]
}

/// Fetch limits handed to the batch fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub max_concurrency: usize,
    pub timeout: Duration,
}

impl AppConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let config = match path {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| format!("reading config {path}: {e}"))?;
                Self::from_yaml(&yaml).map_err(|e| format!("invalid config {path}: {e}"))?
            }
            None => Self::default(),
        };
        info!(
            feeds = config.feeds.len(),
            scrape = config.scrape.as_ref().map(|s| s.label.as_str()).unwrap_or("<none>"),
            window_days = config.window_days,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.window_days == 0 {
            return Err("window_days must be at least 1".into());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".into());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be at least 1".into());
        }
        if self.description_cap == 0 {
            return Err("description_cap must be at least 1".into());
        }

        let mut seen = HashSet::new();
        for feed in &self.feeds {
            if feed.url.trim().is_empty() {
                return Err(format!("feed '{}' has an empty url", feed.label).into());
            }
            if feed.label.trim().is_empty() {
                return Err(format!("feed {} has an empty label", feed.url).into());
            }
            if !seen.insert(feed.url.trim()) {
                return Err(format!("feed {} is listed twice", feed.url).into());
            }
        }

        if let Some(scrape) = &self.scrape {
            if scrape.url.trim().is_empty() {
                return Err("scrape.url must not be empty".into());
            }
            for (field, css) in [
                ("article", &scrape.article),
                ("title", &scrape.title),
                ("link", &scrape.link),
                ("date", &scrape.date),
                ("summary", &scrape.summary),
                ("image", &scrape.image),
            ] {
                if let Err(e) = Selector::parse(css) {
                    return Err(format!("scrape.{field} selector {css:?} is invalid: {e}").into());
                }
            }
        }

        // Source filters are comma-separated lists.
        if let Some(label) = self.source_labels().into_iter().find(|l| l.contains(',')) {
            return Err(format!("source label {label:?} must not contain ','").into());
        }
        Ok(())
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            max_concurrency: self.max_concurrency,
            timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    /// Every label a record may carry.
    pub fn source_labels(&self) -> Vec<String> {
        self.feeds
            .iter()
            .map(|f| f.label.clone())
            .chain(self.scrape.iter().map(|s| s.label.clone()))
            .collect()
    }
}
