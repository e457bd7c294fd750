//! Source fetchers for syndication feeds and the scraped article page.
//!
//! Every source goes through the same two steps:
//!
//! 1. **Fetching**: download the feed or page body over HTTP
//! 2. **Parsing**: turn the body into [`RawEntry`] values labelled with the source
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`feed`] | RSS 2.0 / RSS 1.0 / Atom parsing with `quick-xml` |
//! | [`article_page`] | Selector-driven scraping of one HTML listing page |
//! | [`http`] | The `reqwest` implementation of [`SourceFetcher`] |
//! | [`batch`] | Bounded concurrent fan-out over every configured source |
//!
//! Failures never escape a single source: the batch fetcher turns every
//! error, timeout or empty result into a [`SourceFailure`] and moves on.

pub mod article_page;
pub mod batch;
pub mod feed;
pub mod http;

use crate::config::{FeedSource, ScrapeTarget};
use crate::models::RawEntry;
use std::error::Error;
use std::future::Future;

/// Error type for a single source fetch.
pub type FetchError = Box<dyn Error + Send + Sync>;

/// Retrieves raw entries from one configured source.
///
/// [`http::HttpFetcher`] is the production implementation; tests substitute
/// in-memory fetchers. Implementations may use `async fn`; the returned
/// futures must be `Send` so refreshes can run inside the HTTP server.
pub trait SourceFetcher: Sync {
    /// Fetch and parse one syndication feed.
    fn fetch_feed(
        &self,
        feed: &FeedSource,
    ) -> impl Future<Output = Result<Vec<RawEntry>, FetchError>> + Send;

    /// Fetch and scrape the configured article page.
    fn fetch_page(
        &self,
        target: &ScrapeTarget,
    ) -> impl Future<Output = Result<Vec<RawEntry>, FetchError>> + Send;
}

/// Diagnostic record for a source that contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub url: String,
    pub reason: String,
}

/// Result of fetching one source.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { source: String, entries: Vec<RawEntry> },
    Failed(SourceFailure),
}

impl FetchOutcome {
    /// Split into the entries (empty on failure) and the failure, if any.
    pub fn into_parts(self) -> (Vec<RawEntry>, Option<SourceFailure>) {
        match self {
            FetchOutcome::Fetched { entries, .. } => (entries, None),
            FetchOutcome::Failed(failure) => (Vec::new(), Some(failure)),
        }
    }
}
