//! HTTP-backed [`SourceFetcher`].

use crate::config::{FeedSource, ScrapeTarget};
use crate::models::RawEntry;
use crate::scrapers::{FetchError, SourceFetcher, article_page, feed};
use crate::utils::truncate_for_log;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/127.0.0.0 Safari/537.36"
);

/// Fetches feeds and pages with one shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let res = self.client.get(url).send().await?;

        let status = res.status();
        let final_url = res.url().to_string();
        let ctype = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("<none>")
            .to_string();
        debug!(%final_url, %status, %ctype, "Source response");

        let res = res.error_for_status()?;
        let bytes = res.bytes().await?;
        Ok(bytes.to_vec())
    }
}

impl SourceFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(source = %source.label, url = %source.url))]
    async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<RawEntry>, FetchError> {
        let bytes = self.get_bytes(&source.url).await?;
        let entries = feed::parse_feed(&bytes, &source.label)?;
        if entries.is_empty() {
            let preview = String::from_utf8_lossy(&bytes).replace('\n', " ");
            warn!(preview = %truncate_for_log(&preview, 300), "Feed parsed with no entries");
        }
        info!(count = entries.len(), "Fetched feed");
        Ok(entries)
    }

    #[instrument(level = "info", skip_all, fields(source = %target.label, url = %target.url))]
    async fn fetch_page(&self, target: &ScrapeTarget) -> Result<Vec<RawEntry>, FetchError> {
        let bytes = self.get_bytes(&target.url).await?;
        let html = String::from_utf8_lossy(&bytes).into_owned();
        let entries = article_page::scrape_articles(&html, target)?;
        info!(count = entries.len(), "Scraped article page");
        Ok(entries)
    }
}
