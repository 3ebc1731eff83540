use crate::harvest::listing::RawDate;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Epoch values at or above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y"];

/// A parsed instant plus the offset it was written in, when the text named
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInstant {
    pub instant: DateTime<Utc>,
    pub offset: Option<FixedOffset>,
}

impl ParsedInstant {
    fn utc(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            offset: None,
        }
    }

    fn with_offset(value: DateTime<FixedOffset>) -> Self {
        Self {
            instant: value.with_timezone(&Utc),
            offset: Some(*value.offset()),
        }
    }
}

pub fn parse_raw(raw: &RawDate) -> Option<ParsedInstant> {
    match raw {
        RawDate::Epoch(value) => parse_epoch(*value),
        RawDate::Text(text) => parse_text(text),
    }
}

/// Seconds or milliseconds since the Unix epoch. Non-positive values carry
/// no information and are rejected.
pub fn parse_epoch(value: i64) -> Option<ParsedInstant> {
    if value <= 0 {
        return None;
    }

    let instant = if value >= MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    };
    instant.map(ParsedInstant::utc)
}

pub fn parse_text(text: &str) -> Option<ParsedInstant> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.bytes().all(|byte| byte.is_ascii_digit()) {
        return text.parse::<i64>().ok().and_then(parse_epoch);
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedInstant::with_offset(value));
    }

    for format in OFFSET_FORMATS {
        if let Ok(value) = DateTime::parse_from_str(text, format) {
            return Some(ParsedInstant::with_offset(value));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ParsedInstant::utc(value.and_utc()));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|midnight| ParsedInstant::utc(midnight.and_utc()));
        }
    }

    None
}
