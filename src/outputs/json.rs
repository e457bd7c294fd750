//! JSON output of a [`Digest`].
//!
//! Files are organized by run date:
//! ```text
//! json_output_dir/
//! └── 2025-04-10/
//!     └── news.json
//! ```
//! A second run on the same day overwrites the file.

use crate::models::Digest;
use chrono::NaiveDate;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `digest` to `{json_output_dir}/{date}/news.json`, returning the path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, %date))]
pub async fn write_digest(
    digest: &Digest,
    json_output_dir: &str,
    date: NaiveDate,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let json = serde_json::to_string_pretty(digest)?;

    let full_json_dir = format!("{}/{}", json_output_dir.trim_end_matches('/'), date);
    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = format!("{full_json_dir}/news.json");
    fs::write(&path, json).await?;
    info!(%path, items = digest.items.len(), "Wrote JSON digest");

    Ok(path)
}
