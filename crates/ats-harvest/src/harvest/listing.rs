use super::dates::DateParseStrategy;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

/// Stored in place of a date that no strategy could resolve. Distinct from
/// any real instant, including the Unix epoch.
pub const UNRESOLVED_SENTINEL: &str = "unresolved";

/// Date value as a backend reported it, before any parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDate {
    Text(String),
    Epoch(i64),
}

impl RawDate {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|float| float as i64))
                .map(Self::Epoch),
            Value::String(text) if !text.trim().is_empty() => Some(Self::Text(text.clone())),
            _ => None,
        }
    }
}

/// Structured date fields carried by a source payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDateFields {
    pub published: Option<RawDate>,
    pub updated: Option<RawDate>,
}

/// Listing in the backend-native shape an adapter produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub locations: Vec<String>,
    pub url: String,
    /// Opaque identifier from the payload, when the backend exposes one.
    pub source_id: Option<String>,
    pub team: Option<String>,
    pub dates: RawDateFields,
}

/// A timestamp that some strategy managed to parse. Both renderings are
/// fixed at resolution time; the local one reflects the zone of the machine
/// running the harvest and carries no provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    instant: DateTime<Utc>,
    original_offset_seconds: Option<i32>,
    original: String,
    local: String,
    strategy: DateParseStrategy,
}

impl ResolvedDate {
    /// `offset` is `None` when the source gave a wall-clock time without a
    /// zone; such values are interpreted as UTC.
    pub fn new(
        instant: DateTime<Utc>,
        offset: Option<FixedOffset>,
        strategy: DateParseStrategy,
    ) -> Self {
        let original = match offset {
            Some(offset) => instant
                .with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S %:z")
                .to_string(),
            None => instant.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let local = instant
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string();

        Self {
            instant,
            original_offset_seconds: offset.map(|offset| offset.local_minus_utc()),
            original,
            local,
            strategy,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn original_offset(&self) -> Option<FixedOffset> {
        self.original_offset_seconds
            .and_then(FixedOffset::east_opt)
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn strategy(&self) -> DateParseStrategy {
        self.strategy
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostedDate {
    Resolved(ResolvedDate),
    Unresolved,
}

impl PostedDate {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            PostedDate::Resolved(date) => Some(date.instant()),
            PostedDate::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PostedDate::Resolved(_))
    }

    /// RFC 3339 UTC value written to the store.
    pub fn storage_value(&self) -> String {
        match self {
            PostedDate::Resolved(date) => date
                .instant()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            PostedDate::Unresolved => UNRESOLVED_SENTINEL.to_string(),
        }
    }

    pub fn local_value(&self) -> String {
        match self {
            PostedDate::Resolved(date) => date.local().to_string(),
            PostedDate::Unresolved => UNRESOLVED_SENTINEL.to_string(),
        }
    }
}

/// Backend-agnostic job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub company: String,
    pub title: String,
    pub location: String,
    pub url: String,
    pub token: String,
    pub team: Option<String>,
    pub published_at: PostedDate,
    pub updated_at: PostedDate,
}

/// Orders listings newest first. Unresolved dates sort last and ties keep
/// their input order.
pub fn sort_newest_first(listings: &mut [Listing]) {
    listings.sort_by(|a, b| b.published_at.instant().cmp(&a.published_at.instant()));
}
