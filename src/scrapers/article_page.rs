//! Selector-driven scraping of an HTML article listing.
//!
//! The page is expected to repeat one block per article (for example
//! `<article>` cards). Each block is read with the selectors from
//! [`ScrapeTarget`]:
//!
//! | Field | Rule |
//! |-------|------|
//! | title | text of the first `title` match (required) |
//! | link | `href` of the first `link` match, resolved against the page URL (required) |
//! | date | `datetime` attribute of the first `date` match, else its text (must parse) |
//! | summary | first non-empty text among `summary` matches |
//! | image | `src` (or lazy-load `data-src`) of the first `image` match |
//!
//! A block missing a required field is skipped; the rest of the page is kept.

use crate::config::ScrapeTarget;
use crate::dates::normalize_date;
use crate::models::{MediaFields, NO_DESCRIPTION, RawEntry};
use crate::scrapers::FetchError;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

/// Compiled selectors for one scrape target.
struct Selectors {
    article: Selector,
    title: Selector,
    link: Selector,
    date: Selector,
    summary: Selector,
    image: Selector,
}

impl Selectors {
    fn compile(target: &ScrapeTarget) -> Result<Self, FetchError> {
        let parse = |field: &str, css: &str| {
            Selector::parse(css)
                .map_err(|e| -> FetchError { format!("bad {field} selector {css:?}: {e}").into() })
        };
        Ok(Self {
            article: parse("article", &target.article)?,
            title: parse("title", &target.title)?,
            link: parse("link", &target.link)?,
            date: parse("date", &target.date)?,
            summary: parse("summary", &target.summary)?,
            image: parse("image", &target.image)?,
        })
    }
}

/// Extract raw entries from the listing page `html`.
pub fn scrape_articles(html: &str, target: &ScrapeTarget) -> Result<Vec<RawEntry>, FetchError> {
    let selectors = Selectors::compile(target)?;
    let base = Url::parse(&target.url)?;
    let document = Html::parse_document(html);

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for (index, block) in document.select(&selectors.article).enumerate() {
        match scrape_block(block, &selectors, &base, &target.label) {
            Some(entry) => entries.push(entry),
            None => {
                skipped += 1;
                debug!(index, "Skipping article block with missing or unparsable fields");
            }
        }
    }

    info!(
        source = %target.label,
        count = entries.len(),
        skipped,
        "Scraped article blocks"
    );
    Ok(entries)
}

fn scrape_block(
    block: ElementRef<'_>,
    selectors: &Selectors,
    base: &Url,
    source: &str,
) -> Option<RawEntry> {
    let title = first_text(block, &selectors.title)?;

    let href = block
        .select(&selectors.link)
        .find_map(|el| el.value().attr("href"))
        .or_else(|| block.value().attr("href"))?;
    let link = base.join(href.trim()).ok()?.to_string();

    let date_el = block.select(&selectors.date).next()?;
    let published_raw = date_el
        .value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| collapse(&date_el.text().collect::<String>()));
    if normalize_date(&published_raw).is_none() {
        debug!(%title, raw = %published_raw, "Article date did not parse");
        return None;
    }

    let description_raw = block
        .select(&selectors.summary)
        .map(|el| collapse(&el.text().collect::<String>()))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let image_raw = block
        .select(&selectors.image)
        .find_map(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
        .and_then(|src| base.join(src.trim()).ok())
        .map(|u| u.to_string());

    Some(RawEntry {
        title,
        link,
        published_raw,
        description_raw,
        source: source.to_string(),
        image_raw,
        media: MediaFields::default(),
    })
}

fn first_text(block: ElementRef<'_>, selector: &Selector) -> Option<String> {
    block
        .select(selector)
        .map(|el| collapse(&el.text().collect::<String>()))
        .find(|s| !s.is_empty())
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
