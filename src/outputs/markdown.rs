//! Markdown digest, one section per source.

use crate::models::{Digest, NewsItem};
use crate::utils::slugify_title;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::error::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Render a [`Digest`] as Markdown.
///
/// Sources appear in alphabetical order with a table of contents up top;
/// items keep their digest order (newest first) inside each section.
#[instrument(level = "debug", skip_all, fields(items = digest.items.len()))]
pub fn digest_to_markdown(digest: &Digest) -> String {
    let mut md = String::new();

    md.push_str("# Latest AI News\n\n");
    md.push_str(&format!(
        "#### Generated {} from the last {} days\n\n",
        digest.generated_at.format("%Y-%m-%d %H:%M UTC"),
        digest.window_days
    ));

    let range = match (digest.query.start_date, digest.query.end_date) {
        (Some(s), Some(e)) => Some(format!("{s} to {e}")),
        (Some(s), None) => Some(format!("from {s}")),
        (None, Some(e)) => Some(format!("up to {e}")),
        (None, None) => None,
    };
    if let Some(range) = range {
        md.push_str(&format!("- _Dates: {range}_\n"));
    }
    if !digest.query.sources.is_empty() {
        md.push_str(&format!("- _Sources: {}_\n", digest.query.sources.join(", ")));
    }

    if digest.items.is_empty() {
        md.push_str("\n_No articles matched._\n");
        return md;
    }

    let mut by_source: BTreeMap<&str, Vec<&NewsItem>> = BTreeMap::new();
    for item in &digest.items {
        by_source.entry(item.source.as_str()).or_default().push(item);
    }

    md.push_str("\n## Contents\n\n");
    for (source, items) in &by_source {
        md.push_str(&format!(
            "- [{source}](#{}) ({})\n",
            slugify_title(source),
            items.len()
        ));
    }
    md.push('\n');

    for (source, items) in by_source {
        md.push_str(&format!("## {source}\n\n"));
        for item in items {
            md.push_str(&format!("### [{}]({})\n\n", item.title, item.link));
            md.push_str(&format!("- _Published: {}_\n\n", item.date));
            md.push_str(&format!("![{}]({})\n\n", item.title, item.image));
            md.push_str(item.description.trim());
            md.push_str("\n\n---\n\n");
        }
    }

    debug!(chars = md.len(), "Rendered Markdown length");
    md
}

/// Write the digest to `{markdown_output_dir}/{date}.md`, returning the path.
#[instrument(level = "info", skip_all, fields(markdown_output_dir = %markdown_output_dir, %date))]
pub async fn write_markdown(
    digest: &Digest,
    markdown_output_dir: &str,
    date: NaiveDate,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let markdown = digest_to_markdown(digest);
    fs::create_dir_all(markdown_output_dir).await?;

    let path = format!("{}/{}.md", markdown_output_dir.trim_end_matches('/'), date);
    fs::write(&path, markdown).await?;
    info!(%path, "Wrote Markdown digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DigestQuery;
    use chrono::{TimeZone, Utc};

    fn item(title: &str, source: &str, date: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: format!("Summary of {title}."),
            link: format!("https://example.com/{}", slugify_title(title)),
            source: source.to_string(),
            date: date.to_string(),
            image: "https://img.example.com/placeholder.jpg".to_string(),
        }
    }

    fn digest(items: Vec<NewsItem>) -> Digest {
        Digest {
            generated_at: Utc.with_ymd_and_hms(2025, 4, 10, 8, 30, 0).unwrap(),
            window_days: 7,
            query: DigestQuery::default(),
            items,
        }
    }

    #[test]
    fn test_empty_digest_markdown() {
        let md = digest_to_markdown(&digest(vec![]));
        assert!(md.contains("# Latest AI News"));
        assert!(md.contains("2025-04-10 08:30 UTC"));
        assert!(md.contains("_No articles matched._"));
        assert!(!md.contains("## Contents"));
    }

    #[test]
    fn test_items_grouped_by_source() {
        let md = digest_to_markdown(&digest(vec![
            item("Robots learn to fold laundry", "OpenAI News", "2025-04-09"),
            item("Faster attention kernels", "NVIDIA Blog", "2025-04-08"),
            item("Reasoning benchmarks", "OpenAI News", "2025-04-07"),
        ]));

        assert!(md.contains("- [NVIDIA Blog](#nvidia-blog) (1)"));
        assert!(md.contains("- [OpenAI News](#openai-news) (2)"));

        let nvidia = md.find("## NVIDIA Blog").unwrap();
        let openai = md.find("## OpenAI News").unwrap();
        assert!(nvidia < openai);

        let laundry = md.find("Robots learn to fold laundry").unwrap();
        let reasoning = md.find("### [Reasoning benchmarks]").unwrap();
        assert!(openai < laundry && laundry < reasoning);

        assert!(md.contains("- _Published: 2025-04-08_"));
        assert!(md.contains("Summary of Faster attention kernels."));
    }

    #[test]
    fn test_query_is_echoed() {
        let mut d = digest(vec![item("A", "X", "2025-04-02")]);
        d.query = DigestQuery {
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 7),
            sources: vec!["X".to_string()],
        };
        let md = digest_to_markdown(&d);
        assert!(md.contains("- _Dates: 2025-04-01 to 2025-04-07_"));
        assert!(md.contains("- _Sources: X_"));
    }

    #[tokio::test]
    async fn test_write_markdown_path() {
        let dir = std::env::temp_dir().join(format!("latest_ai_news_md_{}", std::process::id()));
        let dir = dir.to_string_lossy().to_string();
        let date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();

        let path = write_markdown(&digest(vec![item("A", "X", "2025-04-09")]), &dir, date)
            .await
            .unwrap();
        assert!(path.ends_with("/2025-04-10.md"));
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("## X"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
