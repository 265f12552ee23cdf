//! Marking flagged spans in place.
//!
//! Descriptor offsets count code points, while Rust strings are indexed by
//! byte. The annotator maps every code-point index to its byte offset once and
//! slices through that table, so multi-byte text never gets split mid-character.

use std::borrow::Cow;

use crate::speller::ErrorDescriptor;
use crate::{CorrigoError, Result};

/// Strings placed around each flagged span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub open: String,
    pub close: String,
}

impl Markers {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self { open: open.into(), close: close.into() }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new("<mark>", "</mark>")
    }
}

/// Wraps every descriptor's span in `markers`.
///
/// Descriptors must be ascending and non-overlapping; anything else is an
/// [`CorrigoError::InvalidSpan`] and nothing is returned.
///
/// # Example
///
/// ```rust
/// use corrigo_core::annotate::{Markers, annotate};
/// use corrigo_core::speller::{ErrorCode, ErrorDescriptor};
///
/// let text = "café ошибка";
/// let descriptors = [ErrorDescriptor::new(ErrorCode::UnknownWord, 5, 6, "ошибка")];
/// let annotated = annotate(text, &descriptors, &Markers::new("[[", "]]")).unwrap();
/// assert_eq!(annotated, "café [[ошибка]]");
/// ```
pub fn annotate(text: &str, descriptors: &[ErrorDescriptor], markers: &Markers) -> Result<String> {
    annotate_with(text, descriptors, markers, verbatim)
}

/// Like [`annotate`], but passes every copied slice of `text` through `segment`.
///
/// Offsets still refer to the original text. The report uses this to escape
/// HTML while inserting raw `<mark>` tags.
pub fn annotate_with(
    text: &str, descriptors: &[ErrorDescriptor], markers: &Markers, segment: for<'a> fn(&'a str) -> Cow<'a, str>,
) -> Result<String> {
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let text_len = boundaries.len() - 1;

    let mut output = String::with_capacity(text.len() + descriptors.len() * (markers.open.len() + markers.close.len()));
    let mut cursor = 0;

    for descriptor in descriptors {
        let start = descriptor.offset;
        let end = match descriptor.end() {
            Some(end) if start >= cursor && end <= text_len => end,
            _ => return Err(CorrigoError::InvalidSpan { offset: start, length: descriptor.length, text_len }),
        };

        output.push_str(&segment(&text[boundaries[cursor]..boundaries[start]]));
        output.push_str(&markers.open);
        output.push_str(&segment(&text[boundaries[start]..boundaries[end]]));
        output.push_str(&markers.close);
        cursor = end;
    }

    output.push_str(&segment(&text[boundaries[cursor]..]));

    Ok(output)
}

fn verbatim(s: &str) -> Cow<'_, str> {
    Cow::Borrowed(s)
}

/// Escapes text for inclusion in an HTML body.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
