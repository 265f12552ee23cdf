//! Feed enumeration.
//!
//! Only the article links are needed, so feeds are read as an XML event
//! stream and everything except item links is ignored. Both RSS 2.0
//! (`<item><link>url</link>`) and Atom (`<entry><link href="url"/>`) work.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::{CorrigoError, Result};

/// Returns the item links of an RSS or Atom feed, in feed order.
///
/// # Example
///
/// ```rust
/// use corrigo_core::feed::parse_feed_links;
///
/// let rss = r#"<rss><channel><link>https://ria.ru</link>
///     <item><title>A</title><link>https://ria.ru/a.html</link></item>
/// </channel></rss>"#;
/// assert_eq!(parse_feed_links(rss.as_bytes()).unwrap(), vec!["https://ria.ru/a.html"]);
/// ```
pub fn parse_feed_links(document: &[u8]) -> Result<Vec<String>> {
    let text = String::from_utf8_lossy(document);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut links = Vec::new();
    let mut in_item = false;
    let mut in_link = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" | b"entry" => in_item = true,
                b"link" if in_item => {
                    if let Some(href) = href(&e)? {
                        links.push(href);
                    } else {
                        in_link = true;
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_item
                    && e.name().as_ref() == b"link"
                    && let Some(href) = href(&e)?
                {
                    links.push(href);
                }
            }
            Ok(Event::Text(e)) => {
                if in_link {
                    let unescaped = e.unescape().map_err(|e| CorrigoError::FeedError(e.to_string()))?;
                    current.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if in_link {
                    current.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" | b"entry" => in_item = false,
                b"link" if in_link => {
                    in_link = false;
                    let link = current.trim();
                    if !link.is_empty() {
                        links.push(link.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(CorrigoError::FeedError(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    tracing::debug!(items = links.len(), "feed enumerated");
    Ok(links)
}

/// The `href` of an Atom link, preferring `rel="alternate"` (the default).
fn href(e: &BytesStart<'_>) -> Result<Option<String>> {
    let attribute = |name: &str| -> Result<Option<String>> {
        match e.try_get_attribute(name) {
            Ok(Some(attr)) => Ok(Some(
                attr.unescape_value()
                    .map_err(|e| CorrigoError::FeedError(e.to_string()))?
                    .into_owned(),
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(CorrigoError::FeedError(e.to_string())),
        }
    };

    match attribute("rel")? {
        Some(rel) if rel != "alternate" => Ok(None),
        _ => attribute("href"),
    }
}
