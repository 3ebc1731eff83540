//! Source adapters: one per `(backend, source kind)` pair. Each hides its
//! endpoint shapes, pagination and fallbacks behind [`SourceAdapter`].

mod board;
mod greenhouse;
mod lever;

pub use board::{parse_board_page, BoardPage, GreenhouseBoardAdapter};
pub use greenhouse::GreenhouseApiAdapter;
pub use lever::LeverApiAdapter;

use super::http::{FetchError, HttpFetch, PageRenderer, Throttle};
use super::listing::RawListing;
use crate::config::{Backend, OrganizationConfig, SourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on pages fetched from one endpoint, for boards that never
/// stop advertising a next page.
pub const MAX_PAGES: usize = 50;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Every listing the organization currently advertises. Tries alternate
    /// endpoints before giving up.
    async fn fetch_raw_listings(
        &self,
        org: &OrganizationConfig,
    ) -> Result<Vec<RawListing>, SourceError>;

    /// Per-posting endpoint that may carry the publication date.
    fn detail_url(&self, org: &OrganizationConfig, token: &str) -> Option<String>;
}

/// One endpoint that was tried and why it failed.
#[derive(Debug)]
pub struct EndpointAttempt {
    pub endpoint: String,
    pub error: FetchError,
}

impl fmt::Display for EndpointAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.endpoint, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no endpoint available for '{organization}': {}", join_attempts(.attempts))]
    Unavailable {
        organization: String,
        attempts: Vec<EndpointAttempt>,
    },
    #[error("{backend} has no {kind} adapter")]
    Unsupported { backend: Backend, kind: SourceKind },
}

fn join_attempts(attempts: &[EndpointAttempt]) -> String {
    if attempts.is_empty() {
        return "no endpoints configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Picks the adapter for an organization. All network traffic of the
/// adapter passes through `throttle`.
pub fn adapter_for(
    org: &OrganizationConfig,
    fetcher: Arc<dyn HttpFetch>,
    renderer: Arc<dyn PageRenderer>,
    throttle: Arc<Throttle>,
) -> Result<Box<dyn SourceAdapter>, SourceError> {
    match (org.backend, org.source_kind) {
        (Backend::Greenhouse, SourceKind::Api) => {
            Ok(Box::new(GreenhouseApiAdapter::new(fetcher, throttle)))
        }
        (Backend::Lever, SourceKind::Api) => Ok(Box::new(LeverApiAdapter::new(fetcher, throttle))),
        (Backend::Greenhouse, SourceKind::Browser) => {
            Ok(Box::new(GreenhouseBoardAdapter::new(renderer, throttle)))
        }
        (backend, kind) => Err(SourceError::Unsupported { backend, kind }),
    }
}

/// An endpoint to try, and whether it pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub url: String,
    pub paged: bool,
}

/// The organization's own template (if any) followed by the backend's
/// built-in endpoints, with duplicates removed.
pub(crate) fn endpoints_for(org: &OrganizationConfig, builtin: &[(&str, bool)]) -> Vec<Endpoint> {
    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(builtin.len() + 1);
    if !org.endpoint_template.is_empty() {
        let paged = builtin.first().map_or(false, |(_, paged)| *paged);
        endpoints.push(Endpoint {
            url: org.expand(&org.endpoint_template),
            paged,
        });
    }
    for (template, paged) in builtin {
        let url = org.expand(template);
        if !endpoints.iter().any(|endpoint| endpoint.url == url) {
            endpoints.push(Endpoint { url, paged: *paged });
        }
    }
    endpoints
}

/// Returns the first endpoint's listings that loads; records every failure
/// otherwise.
pub(crate) async fn first_available<F, Fut>(
    org: &OrganizationConfig,
    endpoints: Vec<Endpoint>,
    mut fetch: F,
) -> Result<Vec<RawListing>, SourceError>
where
    F: FnMut(Endpoint) -> Fut,
    Fut: Future<Output = Result<Vec<RawListing>, FetchError>>,
{
    let mut attempts = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let url = endpoint.url.clone();
        match fetch(endpoint).await {
            Ok(listings) => {
                debug!(
                    organization = %org.name,
                    endpoint = %url,
                    count = listings.len(),
                    "endpoint answered"
                );
                return Ok(listings);
            }
            Err(error) => {
                warn!(
                    organization = %org.name,
                    endpoint = %url,
                    %error,
                    "endpoint failed, trying next"
                );
                attempts.push(EndpointAttempt {
                    endpoint: url,
                    error,
                });
            }
        }
    }

    Err(SourceError::Unavailable {
        organization: org.name.clone(),
        attempts,
    })
}

/// Reads an explicit JSON `null` as the field's default, so one sparse
/// posting cannot fail a whole page.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lenient identifier rendering for payload ids that may be numbers or
/// strings.
pub(crate) fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if !text.trim().is_empty() => {
            Some(text.trim().to_string())
        }
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
