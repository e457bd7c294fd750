//! Representative-image lookup for feed entries.
//!
//! Feeds advertise images in many weakly-structured ways. [`resolve_image`]
//! evaluates an ordered list of strategies and returns the first URL found:
//!
//! 1. `<media:content url>`
//! 2. `<media:thumbnail url>`
//! 3. `<enclosure>` with an `image/*` MIME type
//! 4. `twitter:image` / `og:image` meta tag inside the description
//! 5. first `<img src>` inside the description
//! 6. regex scan for an `<img ... src>` in the raw or decoded description
//!
//! The last strategy catches descriptions whose markup was escaped twice and
//! therefore never parses into elements. Finding nothing is normal; callers
//! substitute a placeholder.

use crate::models::MediaFields;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::trace;

static META_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[name="twitter:image"], meta[property="twitter:image"], meta[property="og:image"]"#,
    )
    .expect("meta image selector must parse")
});

static INLINE_IMG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img[src]").expect("img selector must parse"));

static IMG_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("img regex must compile")
});

/// What a strategy may look at.
pub struct ImageInput<'a> {
    pub media: &'a MediaFields,
    pub description: &'a str,
}

type Strategy = fn(&ImageInput<'_>) -> Option<String>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("media_content", from_media_content),
    ("media_thumbnail", from_media_thumbnail),
    ("image_enclosure", from_image_enclosure),
    ("meta_tag", from_meta_tag),
    ("inline_img", from_inline_img),
    ("regex_scan", from_regex_scan),
];

/// Find the best image URL for an entry, or `None`.
pub fn resolve_image(media: &MediaFields, description: &str) -> Option<String> {
    let input = ImageInput { media, description };
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(&input)?;
        trace!(strategy = name, url = %found, "Resolved image");
        Some(found)
    })
}

fn non_empty(url: &str) -> Option<String> {
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

fn from_media_content(input: &ImageInput<'_>) -> Option<String> {
    input.media.media_content.as_deref().and_then(non_empty)
}

fn from_media_thumbnail(input: &ImageInput<'_>) -> Option<String> {
    input.media.media_thumbnail.as_deref().and_then(non_empty)
}

fn from_image_enclosure(input: &ImageInput<'_>) -> Option<String> {
    input
        .media
        .enclosures
        .iter()
        .filter(|(_, mime)| mime.trim().to_ascii_lowercase().starts_with("image/"))
        .find_map(|(url, _)| non_empty(url))
}

fn from_meta_tag(input: &ImageInput<'_>) -> Option<String> {
    if !input.description.contains('<') {
        return None;
    }
    let fragment = Html::parse_fragment(input.description);
    fragment
        .select(&META_IMAGE)
        .find_map(|el| el.value().attr("content").and_then(non_empty))
}

fn from_inline_img(input: &ImageInput<'_>) -> Option<String> {
    if !input.description.contains('<') {
        return None;
    }
    let fragment = Html::parse_fragment(input.description);
    fragment
        .select(&INLINE_IMG)
        .find_map(|el| el.value().attr("src").and_then(non_empty))
}

fn from_regex_scan(input: &ImageInput<'_>) -> Option<String> {
    if let Some(url) = scan_img_src(input.description) {
        return Some(url);
    }
    if !input.description.contains('&') {
        return None;
    }
    // Escaped markup (`&lt;img src=...&gt;`) only becomes visible after decoding.
    let decoded: String = Html::parse_fragment(input.description)
        .root_element()
        .text()
        .collect();
    scan_img_src(&decoded)
}

fn scan_img_src(text: &str) -> Option<String> {
    IMG_SRC_RE
        .captures_iter(text)
        .find_map(|caps| caps.get(1).and_then(|m| non_empty(m.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media() -> MediaFields {
        MediaFields::default()
    }

    #[test]
    fn test_media_content_first() {
        let m = MediaFields {
            media_content: Some("https://cdn.example.com/content.jpg".into()),
            media_thumbnail: Some("https://cdn.example.com/thumb.jpg".into()),
            enclosures: vec![("https://cdn.example.com/enc.jpg".into(), "image/jpeg".into())],
        };
        assert_eq!(
            resolve_image(&m, r#"<img src="https://cdn.example.com/inline.jpg">"#).as_deref(),
            Some("https://cdn.example.com/content.jpg")
        );
    }

    #[test]
    fn test_thumbnail_beats_inline_img() {
        let m = MediaFields {
            media_thumbnail: Some("https://cdn.example.com/thumb.jpg".into()),
            ..media()
        };
        assert_eq!(
            resolve_image(&m, r#"<p><img src="https://cdn.example.com/inline.jpg"></p>"#).as_deref(),
            Some("https://cdn.example.com/thumb.jpg")
        );
    }

    #[test]
    fn test_enclosure_requires_image_mime() {
        let m = MediaFields {
            enclosures: vec![
                ("https://cdn.example.com/episode.mp3".into(), "audio/mpeg".into()),
                ("https://cdn.example.com/cover.png".into(), "Image/PNG".into()),
            ],
            ..media()
        };
        assert_eq!(
            resolve_image(&m, "no markup").as_deref(),
            Some("https://cdn.example.com/cover.png")
        );

        let audio_only = MediaFields {
            enclosures: vec![("https://cdn.example.com/episode.mp3".into(), "audio/mpeg".into())],
            ..media()
        };
        assert_eq!(resolve_image(&audio_only, "no markup"), None);
    }

    #[test]
    fn test_meta_tag_beats_inline_img() {
        let description = r#"<meta name="twitter:image" content="https://cdn.example.com/card.jpg">
            <p>Body <img src="https://cdn.example.com/inline.jpg"></p>"#;
        assert_eq!(
            resolve_image(&media(), description).as_deref(),
            Some("https://cdn.example.com/card.jpg")
        );
    }

    #[test]
    fn test_inline_img() {
        let description = r#"<p>Intro</p><img alt="x" src="https://cdn.example.com/inline.jpg"/>"#;
        assert_eq!(
            resolve_image(&media(), description).as_deref(),
            Some("https://cdn.example.com/inline.jpg")
        );
    }

    #[test]
    fn test_escaped_img_found_by_scan() {
        let description = r#"&lt;img src="https://cdn.example.com/escaped.jpg"&gt; A caption"#;
        assert_eq!(
            resolve_image(&media(), description).as_deref(),
            Some("https://cdn.example.com/escaped.jpg")
        );
    }

    #[test]
    fn test_blank_urls_are_skipped() {
        let m = MediaFields {
            media_content: Some("   ".into()),
            media_thumbnail: Some(String::new()),
            ..media()
        };
        assert_eq!(
            resolve_image(&m, r#"<img src="https://cdn.example.com/inline.jpg">"#).as_deref(),
            Some("https://cdn.example.com/inline.jpg")
        );
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(resolve_image(&media(), "Plain text summary."), None);
        assert_eq!(resolve_image(&media(), ""), None);
    }
}
