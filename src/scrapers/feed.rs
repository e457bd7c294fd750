//! Syndication feed parsing.
//!
//! [`parse_feed`] walks the document with the `quick-xml` event reader and
//! collects every RSS `<item>` or Atom `<entry>`. It understands:
//!
//! - titles and links (text links, or Atom `<link href>` with `rel="alternate"`)
//! - publish dates from `pubDate`, `published`, `dc:date` or `updated`
//! - descriptions from `description`, `summary`, `content:encoded` or `content`
//! - `media:content`, `media:thumbnail` and `enclosure` attachments
//!
//! Markup nested inside a description (Atom `type="xhtml"` content) is
//! re-serialized into the description so image lookup can still see it.

use crate::models::{MediaFields, NO_DATE, NO_DESCRIPTION, NO_LINK, NO_TITLE, RawEntry};
use crate::scrapers::FetchError;
use quick_xml::Reader;
use quick_xml::escape;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Which entry field the reader is currently collecting text for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    /// Publish date; lower rank wins.
    Published(u8),
    /// Description body; lower rank wins.
    Description(u8),
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubdate" => Some(Field::Published(0)),
        b"published" => Some(Field::Published(1)),
        b"dc:date" => Some(Field::Published(2)),
        b"updated" => Some(Field::Published(3)),
        b"description" => Some(Field::Description(0)),
        b"summary" => Some(Field::Description(1)),
        b"content:encoded" => Some(Field::Description(2)),
        b"content" => Some(Field::Description(3)),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    published: Option<(u8, String)>,
    description: Option<(u8, String)>,
    media: MediaFields,
}

impl EntryBuilder {
    fn commit(&mut self, field: Field, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        match field {
            Field::Title => {
                self.title.get_or_insert(text);
            }
            Field::Link => {
                self.link.get_or_insert(text);
            }
            Field::Published(rank) => offer(&mut self.published, rank, text),
            Field::Description(rank) => offer(&mut self.description, rank, text),
        }
    }

    /// Record attachments and Atom links carried as attributes.
    fn absorb_attributes(&mut self, name: &[u8], e: &BytesStart<'_>) {
        match name {
            b"media:content" => {
                let is_image = attr(e, b"medium").is_none_or(|m| m.eq_ignore_ascii_case("image"))
                    && attr(e, b"type").is_none_or(|t| t.to_ascii_lowercase().starts_with("image/"));
                if is_image && self.media.media_content.is_none() {
                    self.media.media_content = attr(e, b"url");
                }
            }
            b"media:thumbnail" => {
                if self.media.media_thumbnail.is_none() {
                    self.media.media_thumbnail = attr(e, b"url");
                }
            }
            b"enclosure" => {
                if let Some(url) = attr(e, b"url") {
                    let mime = attr(e, b"type").unwrap_or_default();
                    self.media.enclosures.push((url, mime));
                }
            }
            b"link" => {
                let Some(href) = attr(e, b"href") else {
                    return;
                };
                match attr(e, b"rel").as_deref() {
                    None | Some("alternate") => {
                        self.link.get_or_insert(href);
                    }
                    Some("enclosure") => {
                        let mime = attr(e, b"type").unwrap_or_default();
                        self.media.enclosures.push((href, mime));
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }

    fn finish(self, source: &str) -> RawEntry {
        RawEntry {
            title: self.title.unwrap_or_else(|| NO_TITLE.to_string()),
            link: self.link.unwrap_or_else(|| NO_LINK.to_string()),
            published_raw: self
                .published
                .map(|(_, s)| s)
                .unwrap_or_else(|| NO_DATE.to_string()),
            description_raw: self
                .description
                .map(|(_, s)| s)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            source: source.to_string(),
            image_raw: None,
            media: self.media,
        }
    }
}

fn offer(slot: &mut Option<(u8, String)>, rank: u8, text: String) {
    match slot {
        Some((current, _)) if *current <= rank => {}
        _ => *slot = Some((rank, text)),
    }
}

/// Unescaped value of attribute `key`, if present and non-empty.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(key))
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            match escape::unescape(&raw) {
                Ok(cow) => cow.into_owned(),
                Err(_) => raw,
            }
        })
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lower_name(e: &BytesStart<'_>) -> Vec<u8> {
    e.name().as_ref().to_ascii_lowercase()
}

/// The text collection in progress for one entry field.
struct Capture {
    field: Field,
    /// Element name that opened the field; its matching end tag closes it.
    name: Vec<u8>,
    /// Nesting depth of same-named elements inside the field.
    depth: usize,
    text: String,
}

/// Parse an RSS or Atom document into raw entries labelled with `source`.
///
/// An XML error after some entries were read keeps those entries; an error
/// before any entry was read is returned.
pub fn parse_feed(xml: &[u8], source: &str) -> Result<Vec<RawEntry>, FetchError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().check_end_names = false;

    let mut buf = Vec::<u8>::new();
    let mut entries = Vec::<RawEntry>::new();
    let mut current: Option<EntryBuilder> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = lower_name(&e);
                if let Some(cap) = capture.as_mut() {
                    if name == cap.name {
                        cap.depth += 1;
                    }
                    cap.text.push('<');
                    cap.text.push_str(&String::from_utf8_lossy(&e));
                    cap.text.push('>');
                } else if name == b"item" || name == b"entry" {
                    current = Some(EntryBuilder::default());
                } else if let Some(entry) = current.as_mut() {
                    entry.absorb_attributes(&name, &e);
                    if let Some(field) = field_for(&name) {
                        capture = Some(Capture {
                            field,
                            name,
                            depth: 0,
                            text: String::new(),
                        });
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = lower_name(&e);
                if let Some(cap) = capture.as_mut() {
                    cap.text.push('<');
                    cap.text.push_str(&String::from_utf8_lossy(&e));
                    cap.text.push_str("/>");
                } else if let Some(entry) = current.as_mut() {
                    entry.absorb_attributes(&name, &e);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_ascii_lowercase();
                if let Some(mut cap) = capture.take() {
                    if name == cap.name && cap.depth == 0 {
                        if let Some(entry) = current.as_mut() {
                            entry.commit(cap.field, cap.text);
                        }
                    } else {
                        if name == cap.name {
                            cap.depth -= 1;
                        }
                        cap.text.push_str("</");
                        cap.text.push_str(&String::from_utf8_lossy(&name));
                        cap.text.push('>');
                        capture = Some(cap);
                    }
                } else if name == b"item" || name == b"entry" {
                    if let Some(entry) = current.take() {
                        entries.push(entry.finish(source));
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(cap) = capture.as_mut() {
                    let raw = String::from_utf8_lossy(&t);
                    let text: Cow<'_, str> = match escape::unescape(&raw) {
                        Ok(cow) => cow,
                        Err(_) => Cow::Borrowed(raw.as_ref()),
                    };
                    cap.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(cap) = capture.as_mut() {
                    let name = String::from_utf8_lossy(&r).into_owned();
                    match r.resolve_char_ref() {
                        Ok(Some(ch)) => cap.text.push(ch),
                        _ => match escape::resolve_predefined_entity(&name) {
                            Some(resolved) => cap.text.push_str(resolved),
                            // Unknown (usually HTML) entity; the markup cleaner decodes it later.
                            None => {
                                cap.text.push('&');
                                cap.text.push_str(&name);
                                cap.text.push(';');
                            }
                        },
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                if entries.is_empty() {
                    return Err(format!(
                        "XML parse error at offset {}: {e}",
                        reader.buffer_position()
                    )
                    .into());
                }
                warn!(
                    error = %e,
                    offset = reader.buffer_position(),
                    kept = entries.len(),
                    source,
                    "XML parse error; keeping entries read so far"
                );
                break;
            }
        }
        buf.clear();
    }

    debug!(source, count = entries.len(), "Parsed feed entries");
    Ok(entries)
}
