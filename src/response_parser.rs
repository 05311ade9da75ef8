//! Response parsing: download filenames and search payloads

use crate::error::ParseError;
use crate::types::{AudioFormat, VideoResult};
use once_cell::sync::Lazy;
use regex::Regex;

// Locates the start of the value; the value itself is scanned by hand because
// the quoted form needs a backreference to the opening quote.
#[allow(clippy::expect_used)]
static FILENAME_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)filename[^;=\n]*=").expect("filename pattern is a valid literal")
});

/// Filename to save a download under
///
/// Uses the `filename` parameter of a Content-Disposition header when one is
/// present (the `filename*` spelling is accepted too); quote characters are
/// removed from the value. Otherwise falls back to `{title}.{format}`, with
/// `audio` standing in for an empty title.
///
/// The extracted value is trimmed, and a value that is empty once quotes are
/// stripped (e.g. `filename=""`) also takes the title fallback.
///
/// # Examples
///
/// ```
/// use v2a_dl::response_parser::extract_filename;
/// use v2a_dl::AudioFormat;
///
/// let name = extract_filename(Some(r#"attachment; filename="Song.mp3""#), "ignored", AudioFormat::Mp3);
/// assert_eq!(name, "Song.mp3");
///
/// let name = extract_filename(None, "My Song", AudioFormat::Wav);
/// assert_eq!(name, "My Song.wav");
/// ```
pub fn extract_filename(
    header_value: Option<&str>,
    fallback_title: &str,
    format: AudioFormat,
) -> String {
    if let Some(value) = header_value
        && let Some(name) = filename_param(value)
    {
        let name: String = name.chars().filter(|c| *c != '"' && *c != '\'').collect();
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let title = fallback_title.trim();
    let title = if title.is_empty() { "audio" } else { title };
    format!("{title}.{format}")
}

/// Raw (unstripped) value of the first `filename` parameter
fn filename_param(header: &str) -> Option<&str> {
    let found = FILENAME_PARAM.find(header)?;
    let rest = &header[found.end()..];

    // Quoted: up to the matching quote on the same line.
    if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &rest[1..];
        if let Some(close) = body.find([quote, '\n'])
            && body[close..].starts_with(quote)
        {
            return Some(&rest[..close + 2]);
        }
    }

    // Unquoted (or unterminated quote): up to `;` or end of line.
    let end = rest.find([';', '\n']).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Check that a search body is a JSON array and decode its entries
///
/// Only the shape is validated: the body must be an array of objects. Entry
/// fields are decoded leniently (see [`VideoResult`]), so an oddly typed
/// field never rejects the list.
pub fn validate_search_payload(body: &[u8]) -> Result<Vec<VideoResult>, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ParseError::NotASequence);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(ParseError::InvalidItem {
                    index,
                    reason: "entry is not an object".to_string(),
                });
            }
            serde_json::from_value(item).map_err(|e| ParseError::InvalidItem {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}
