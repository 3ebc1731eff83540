use super::parser::{parse_raw, ParsedInstant};
use crate::harvest::listing::RawDate;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Keys a detail payload may carry its publication date under, in order of
/// preference.
pub const DETAIL_FIELDS: &[&str] = &[
    "published_at",
    "first_published",
    "createdAt",
    "created_at",
    "publishedAt",
];

/// Reads the first known date field from a detail response. JSON bodies are
/// read structurally; anything else is scanned for embedded key/value pairs.
pub fn detail_date(body: &str) -> Option<ParsedInstant> {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        return DETAIL_FIELDS
            .iter()
            .filter_map(|key| fields.get(*key))
            .filter_map(RawDate::from_json)
            .find_map(|raw| parse_raw(&raw));
    }

    embedded_fields()
        .iter()
        .filter_map(|pattern| pattern.captures(body))
        .filter_map(|captures| raw_from_captures(&captures))
        .find_map(|raw| parse_raw(&raw))
}

/// Scans a rendered posting page for the first recognizable publication
/// marker.
pub fn page_date(body: &str) -> Option<ParsedInstant> {
    page_patterns()
        .iter()
        .filter_map(|pattern| pattern.captures(body))
        .filter_map(|captures| raw_from_captures(&captures))
        .find_map(|raw| parse_raw(&raw))
}

/// Patterns capture either `epoch` digits or free `text`.
fn raw_from_captures(captures: &regex::Captures<'_>) -> Option<RawDate> {
    if let Some(epoch) = captures.name("epoch") {
        return epoch.as_str().parse().ok().map(RawDate::Epoch);
    }
    captures
        .name("text")
        .map(|text| text.as_str().trim().to_string())
        .filter(|text| !text.is_empty())
        .map(RawDate::Text)
}

fn embedded_fields() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DETAIL_FIELDS
            .iter()
            .map(|key| {
                Regex::new(&format!(
                    r#"\\?"{key}\\?"\s*:\s*(?:(?P<epoch>\d+)|\\?"(?P<text>[^"\\]+)\\?")"#
                ))
                .expect("detail field pattern compiles")
            })
            .collect()
    })
}

fn page_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#""createdAt"\s*:\s*(?P<epoch>\d+)"#,
            r#""createdAt"\s*:\s*"(?P<text>[^"]+)""#,
            r#""published_at"\s*:\s*"(?P<text>[^"]+)""#,
            r#"data-created="(?P<text>[^"]+)""#,
            r"posted on (?P<text>[a-z]+ \d{1,2}, \d{4})",
            r"posting-date[^>]*>\s*(?P<text>[^<]+?)\s*<",
            r#""publishedAt"\s*:\s*(?P<epoch>\d+)"#,
        ]
        .iter()
        .map(|pattern| Regex::new(&format!("(?i){pattern}")).expect("page pattern compiles"))
        .collect()
    })
}
