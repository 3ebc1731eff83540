use super::listing::{Listing, PostedDate, RawListing};
use crate::config::{Backend, OrganizationConfig};
use regex::Regex;
use std::sync::OnceLock;

/// Placeholder written when a source reports no usable location.
pub const LOCATION_NOT_SPECIFIED: &str = "Location not specified";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("no listing token found in '{url}'")]
    TokenExtractionFailed { url: String },
}

/// Maps an adapter listing onto the canonical schema. Dates stay unresolved
/// here; the raw fields are resolved later by the date resolver.
pub fn normalize(raw: &RawListing, org: &OrganizationConfig) -> Result<Listing, NormalizeError> {
    let token = raw
        .source_id
        .as_deref()
        .map(clean_text)
        .filter(|id| !id.is_empty())
        .or_else(|| extract_token(&raw.url, org.backend))
        .ok_or_else(|| NormalizeError::TokenExtractionFailed {
            url: raw.url.clone(),
        })?;

    Ok(Listing {
        company: org.display_name.clone(),
        title: clean_text(&raw.title),
        location: join_locations(&raw.locations),
        url: raw.url.trim().to_string(),
        token,
        team: raw
            .team
            .as_deref()
            .map(clean_text)
            .filter(|team| !team.is_empty()),
        published_at: PostedDate::Unresolved,
        updated_at: PostedDate::Unresolved,
    })
}

/// Tries the backend's URL patterns in order and returns the first capture.
pub fn extract_token(url: &str, backend: Backend) -> Option<String> {
    token_patterns(backend)
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

fn token_patterns(backend: Backend) -> &'static [Regex] {
    static GREENHOUSE: OnceLock<Vec<Regex>> = OnceLock::new();
    static LEVER: OnceLock<Vec<Regex>> = OnceLock::new();

    match backend {
        Backend::Greenhouse => GREENHOUSE.get_or_init(|| {
            compile(&[
                r"gh_jid=(\d+)",
                r"[?&]token=(\d+)",
                r"/jobs/listing/[^/]+/(\d+)",
                r"/listing/[^/]+/(\d+)",
                r"/jobs/(\d+)",
            ])
        }),
        Backend::Lever => LEVER.get_or_init(|| {
            compile(&[
                r"jobs\.lever\.co/[^/]+/([0-9a-fA-F-]{36})",
                r"/([0-9a-fA-F-]{36})(?:/apply)?/?$",
            ])
        }),
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("token pattern compiles"))
        .collect()
}

/// Strips byte-order marks and zero-width spaces and collapses whitespace.
pub(crate) fn clean_text(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_locations(locations: &[String]) -> String {
    let mut unique: Vec<String> = Vec::with_capacity(locations.len());
    for location in locations {
        let cleaned = clean_text(location);
        if !cleaned.is_empty() && !unique.contains(&cleaned) {
            unique.push(cleaned);
        }
    }

    if unique.is_empty() {
        LOCATION_NOT_SPECIFIED.to_string()
    } else {
        unique.join(", ")
    }
}
