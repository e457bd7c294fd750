//! # Latest AI News
//!
//! Aggregates recent AI research and industry news from a fixed set of
//! RSS/Atom feeds plus one scraped HTML listing page, keeps the last week of
//! articles, and serves them with date-range and source filters.
//!
//! ## Features
//!
//! - Concurrent feed fetching with a bounded pool, per-source timeouts and
//!   per-source failure isolation
//! - Publish dates normalized from RFC 822, ISO 8601 and several looser layouts
//! - Descriptions stripped of markup; a representative image found from media
//!   tags, enclosures or the description itself
//! - Output as a JSON digest, a Markdown digest, or an HTTP JSON API
//!
//! ## Usage
//!
//! ```sh
//! latest_ai_news fetch -j ./json -m ./markdown
//! latest_ai_news serve --bind 0.0.0.0:8000
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: every configured feed in parallel, then the scrape target
//! 2. **Pipeline**: normalize dates, keep the trailing window, sort, clean
//! 3. **Query**: filter by date range and source labels
//! 4. **Output**: JSON and Markdown files, or the API's response

use chrono::{Local, Utc};
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod dates;
mod images;
mod markup;
mod models;
mod outputs;
mod pipeline;
mod query;
mod scrapers;
mod server;
mod utils;

use cli::{Cli, Command, FetchArgs, ServeArgs};
use config::AppConfig;
use models::{Digest, DigestQuery, NewsItem};
use outputs::{json, markdown};
use pipeline::refresh_records;
use query::{NewsQuery, query};
use scrapers::http::HttpFetcher;
use server::{AppState, router};
use utils::ensure_writable_dir;

type AppError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("latest_ai_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = AppConfig::load(args.config.as_deref()).await?;

    match args.command {
        Command::Fetch(fetch_args) => run_fetch(config, fetch_args).await,
        Command::Serve(serve_args) => run_serve(config, serve_args).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn run_fetch(config: AppConfig, args: FetchArgs) -> Result<(), AppError> {
    let start_time = std::time::Instant::now();

    // Early check: fail before fetching if the outputs cannot be written
    for dir in [&args.json_output_dir, &args.markdown_output_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let known = config.source_labels();
    for source in args.sources.iter().filter(|s| !known.contains(s)) {
        warn!(%source, "Requested source is not configured; it will match nothing");
    }

    let fetcher = HttpFetcher::new(config.fetch_settings().timeout)?;
    let today = Local::now().date_naive();
    let refresh = refresh_records(&fetcher, &config, today).await;

    let news_query = NewsQuery {
        start: args.start_date,
        end: args.end_date,
        sources: args.sources.clone(),
    };
    let matched = query(&refresh.records, &news_query);
    if refresh.records.is_empty() {
        warn!("No data available; writing an empty digest");
    } else if matched.is_empty() {
        info!(available = refresh.records.len(), "No articles matched the filters");
    }

    let digest = Digest {
        generated_at: Utc::now(),
        window_days: config.window_days,
        query: DigestQuery {
            start_date: args.start_date,
            end_date: args.end_date,
            sources: args.sources,
        },
        items: matched
            .iter()
            .map(|r| NewsItem::from_record(r, &config.placeholder_image))
            .collect(),
    };

    let json_path = json::write_digest(&digest, &args.json_output_dir, today).await?;
    let markdown_path = markdown::write_markdown(&digest, &args.markdown_output_dir, today).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        items = digest.items.len(),
        failed_sources = refresh.failures.len(),
        %json_path,
        %markdown_path,
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(bind = %args.bind))]
async fn run_serve(config: AppConfig, args: ServeArgs) -> Result<(), AppError> {
    let fetcher = HttpFetcher::new(config.fetch_settings().timeout)?;
    let state = Arc::new(AppState::new(config, fetcher));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await?;
    info!(addr = %listener.local_addr()?, "Serving news API");
    axum::serve(listener, app).await?;
    Ok(())
}
