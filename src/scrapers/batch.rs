//! Concurrent fan-out over every configured source.
//!
//! Feeds are fetched through a bounded pool (`buffer_unordered`) so that at
//! most `max_concurrency` requests are in flight. Every fetch is wrapped in a
//! timeout; errors, timeouts and empty feeds all become [`SourceFailure`]
//! records and never cancel sibling fetches. Once the pool drains, the
//! scrape target is fetched on its own and appended.

use crate::config::{FeedSource, FetchSettings, ScrapeTarget};
use crate::models::RawEntry;
use crate::scrapers::{FetchError, FetchOutcome, SourceFailure, SourceFetcher};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Everything one batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Entries from every successful source, feeds in configuration order
    /// followed by the scraped page.
    pub entries: Vec<RawEntry>,
    pub failures: Vec<SourceFailure>,
    /// Number of sources that contributed entries.
    pub succeeded: usize,
}

impl BatchReport {
    fn absorb(&mut self, outcome: FetchOutcome) {
        if let FetchOutcome::Fetched { source, entries } = &outcome {
            debug!(%source, count = entries.len(), "Merging source entries");
        }
        let (mut entries, failure) = outcome.into_parts();
        match failure {
            Some(failure) => self.failures.push(failure),
            None => {
                self.succeeded += 1;
                self.entries.append(&mut entries);
            }
        }
    }
}

/// Fetch every feed concurrently, then the scrape target, and merge the results.
#[instrument(level = "info", skip_all, fields(feeds = feeds.len(), max_concurrency = settings.max_concurrency))]
pub async fn fetch_all<F: SourceFetcher>(
    fetcher: &F,
    feeds: &[FeedSource],
    scrape: Option<&ScrapeTarget>,
    settings: &FetchSettings,
) -> BatchReport {
    let limit = settings.max_concurrency.max(1);

    // Owned items keep the stream Send for generic fetchers.
    let mut outcomes: Vec<(usize, FetchOutcome)> = stream::iter(feeds.iter().cloned().enumerate())
        .map(|(index, feed)| async move {
            let outcome = guarded(
                &feed.label,
                &feed.url,
                settings.timeout,
                fetcher.fetch_feed(&feed),
            )
            .await;
            (index, outcome)
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    // Completion order is arbitrary; merge in configuration order.
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = BatchReport::default();
    for (_, outcome) in outcomes {
        report.absorb(outcome);
    }

    if let Some(target) = scrape {
        let outcome = guarded(
            &target.label,
            &target.url,
            settings.timeout,
            fetcher.fetch_page(target),
        )
        .await;
        report.absorb(outcome);
    }

    info!(
        entries = report.entries.len(),
        succeeded = report.succeeded,
        failed = report.failures.len(),
        "Batch fetch complete"
    );
    report
}

/// Run one source fetch with a timeout and turn every failure mode into a [`FetchOutcome`].
async fn guarded<Fut>(label: &str, url: &str, limit: Duration, fetch: Fut) -> FetchOutcome
where
    Fut: Future<Output = Result<Vec<RawEntry>, FetchError>>,
{
    let failed = |reason: String| {
        FetchOutcome::Failed(SourceFailure {
            source: label.to_string(),
            url: url.to_string(),
            reason,
        })
    };

    match timeout(limit, fetch).await {
        Ok(Ok(entries)) if entries.is_empty() => {
            warn!(source = label, %url, "Source produced no entries");
            failed("no entries".to_string())
        }
        Ok(Ok(entries)) => FetchOutcome::Fetched {
            source: label.to_string(),
            entries,
        },
        Ok(Err(e)) => {
            warn!(source = label, %url, error = %e, "Source fetch failed");
            failed(e.to_string())
        }
        Err(_) => {
            warn!(source = label, %url, ?limit, "Source fetch timed out");
            failed(format!("timed out after {}s", limit.as_secs_f32()))
        }
    }
}
