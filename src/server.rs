//! HTTP JSON API over the pipeline.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/api/news` | GET | `[NewsItem]` filtered by `start_date`, `end_date` (`YYYY-MM-DD`) and `sources` (`A,B`) |
//! | `/api/sources` | GET | sorted source labels present in the current record set |
//! | `/api/range` | GET | suggested `start_date`/`end_date` covering the last week of records |
//! | `/api/refresh` | POST | drops the cached record set; the next read fetches again |
//! | `/health` | GET | `ok` |
//!
//! The record set is fetched on first use and kept for `cache_ttl_secs`.
//! Concurrent readers that miss the cache wait on the same refresh instead of
//! each starting one.

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::models::{NewsItem, NormalizedRecord};
use crate::pipeline::refresh_records;
use crate::query::{NewsQuery, available_sources, default_range, query};
use crate::scrapers::SourceFetcher;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

type Records = Arc<Vec<NormalizedRecord>>;

pub struct AppState<F> {
    config: AppConfig,
    fetcher: F,
    cache: Mutex<TtlCache<Records>>,
}

impl<F: SourceFetcher> AppState<F> {
    pub fn new(config: AppConfig, fetcher: F) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            fetcher,
            cache: Mutex::new(TtlCache::new(ttl)),
        }
    }

    /// State whose cache already holds `records`.
    pub fn with_records(config: AppConfig, fetcher: F, records: Vec<NormalizedRecord>) -> Self {
        let mut cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        cache.insert(Arc::new(records));
        Self {
            config,
            fetcher,
            cache: Mutex::new(cache),
        }
    }

    /// Cached records, refreshing them first when the cache is stale.
    async fn records(&self) -> Records {
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.get() {
            return records;
        }

        let today = Local::now().date_naive();
        let refresh = refresh_records(&self.fetcher, &self.config, today).await;
        let records = Arc::new(refresh.records);
        cache.insert(Arc::clone(&records));
        records
    }
}

pub fn router<F>(state: Arc<AppState<F>>) -> Router
where
    F: SourceFetcher + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/news", get(news::<F>))
        .route("/api/sources", get(sources::<F>))
        .route("/api/range", get(range::<F>))
        .route("/api/refresh", post(refresh::<F>))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct NewsParams {
    start_date: Option<String>,
    end_date: Option<String>,
    sources: Option<String>,
}

impl NewsParams {
    fn into_query(self) -> Result<NewsQuery, String> {
        Ok(NewsQuery {
            start: parse_date("start_date", self.start_date.as_deref())?,
            end: parse_date("end_date", self.end_date.as_deref())?,
            sources: self
                .sources
                .as_deref()
                .map(NewsQuery::parse_sources)
                .unwrap_or_default(),
        })
    }
}

fn parse_date(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("{name} must be YYYY-MM-DD, got {v:?}")),
    }
}

#[instrument(level = "info", skip_all)]
async fn news<F>(
    State(state): State<Arc<AppState<F>>>,
    Query(params): Query<NewsParams>,
) -> Result<Json<Vec<NewsItem>>, (StatusCode, String)>
where
    F: SourceFetcher + Send + Sync + 'static,
{
    let q = params
        .into_query()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let records = state.records().await;
    if records.is_empty() {
        warn!("No data available");
        return Ok(Json(Vec::new()));
    }

    let placeholder = &state.config.placeholder_image;
    let items: Vec<NewsItem> = query(&records, &q)
        .iter()
        .map(|r| NewsItem::from_record(r, placeholder))
        .collect();
    info!(
        available = records.len(),
        matched = items.len(),
        sources = ?q.sources,
        "Served news query"
    );
    Ok(Json(items))
}

async fn sources<F>(State(state): State<Arc<AppState<F>>>) -> Json<Vec<String>>
where
    F: SourceFetcher + Send + Sync + 'static,
{
    let records = state.records().await;
    Json(available_sources(&records))
}

/// Days covered by the suggested range.
const DEFAULT_RANGE_DAYS: u32 = 7;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeResp {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

async fn range<F>(State(state): State<Arc<AppState<F>>>) -> Json<RangeResp>
where
    F: SourceFetcher + Send + Sync + 'static,
{
    let records = state.records().await;
    let (start_date, end_date) = match default_range(&records, DEFAULT_RANGE_DAYS) {
        Some((start, end)) => (Some(start), Some(end)),
        None => (None, None),
    };
    Json(RangeResp {
        start_date,
        end_date,
    })
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResp {
    pub status: String,
}

async fn refresh<F>(State(state): State<Arc<AppState<F>>>) -> Json<RefreshResp>
where
    F: SourceFetcher + Send + Sync + 'static,
{
    let mut cache = state.cache.lock().await;
    let was_fresh = cache.is_fresh();
    cache.invalidate();
    info!(was_fresh, "Record cache invalidated");
    Json(RefreshResp {
        status: "invalidated".to_string(),
    })
}
