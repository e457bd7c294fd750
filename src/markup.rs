//! Description cleanup: strip markup, drop newlines, bound the length.

use scraper::Html;
use tracing::debug;

/// Default maximum description length, in characters.
pub const DESCRIPTION_CAP: usize = 500;

/// Reduce an HTML-ish blob to its visible text.
///
/// Tags are removed and entities decoded by the HTML parser, literal
/// newline characters are dropped, and the result is cut to the first
/// `max_chars` characters. Stripping happens before truncation so the
/// budget is spent on visible text only.
///
/// Markup with no visible text (an image-only description, say) cleans to
/// an empty string.
pub fn clean_markup(text: &str, max_chars: usize) -> String {
    let visible = if looks_like_markup(text) {
        let fragment = Html::parse_fragment(text);
        let extracted: String = fragment.root_element().text().collect();
        if extracted.trim().is_empty() && !text.trim().is_empty() {
            debug!(preview = %truncate_chars(text, 80), "Markup has no visible text");
        }
        extracted
    } else {
        text.to_string()
    };

    let single_line: String = visible.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    truncate_chars(&single_line, max_chars)
}

/// First `max_chars` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn looks_like_markup(text: &str) -> bool {
    text.contains('<') || text.contains('&')
}
