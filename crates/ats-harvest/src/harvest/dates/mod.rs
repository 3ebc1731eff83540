//! Publication date resolution.
//!
//! Sources report dates inconsistently: some carry a structured field, some
//! only expose the date on a per-posting detail endpoint, and some only in
//! the rendered posting page. [`DateResolver`] walks those strategies in a
//! fixed order and settles on [`PostedDate::Unresolved`] when all of them
//! come up empty.

mod parser;
mod scan;

pub use parser::{parse_epoch, parse_raw, parse_text, ParsedInstant};
pub use scan::{detail_date, page_date, DETAIL_FIELDS};

use super::http::{HttpFetch, Throttle};
use super::listing::{PostedDate, RawDate, RawDateFields, ResolvedDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateParseStrategy {
    StructuredField,
    DetailEndpoint,
    PageScan,
}

impl DateParseStrategy {
    /// Strategies in the order they are attempted.
    pub const fn ordered() -> [Self; 3] {
        [Self::StructuredField, Self::DetailEndpoint, Self::PageScan]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::StructuredField => "structured_field",
            Self::DetailEndpoint => "detail_endpoint",
            Self::PageScan => "page_scan",
        }
    }
}

fn resolved(parsed: ParsedInstant, strategy: DateParseStrategy) -> ResolvedDate {
    ResolvedDate::new(parsed.instant, parsed.offset, strategy)
}

/// Parses a structured field without touching the network.
pub fn resolve_structured(raw: Option<&RawDate>) -> PostedDate {
    raw.and_then(parse_raw)
        .map(|parsed| PostedDate::Resolved(resolved(parsed, DateParseStrategy::StructuredField)))
        .unwrap_or(PostedDate::Unresolved)
}

/// Resolves publication dates for one organization. Every network lookup
/// waits on the organization's throttle first.
pub struct DateResolver {
    fetcher: Arc<dyn HttpFetch>,
    throttle: Arc<Throttle>,
}

impl DateResolver {
    pub fn new(fetcher: Arc<dyn HttpFetch>, throttle: Arc<Throttle>) -> Self {
        Self { fetcher, throttle }
    }

    /// Never fails; exhausting every strategy yields `Unresolved`.
    pub async fn resolve(
        &self,
        raw: &RawDateFields,
        detail_url: Option<&str>,
        page_url: &str,
    ) -> PostedDate {
        for strategy in DateParseStrategy::ordered() {
            let parsed = match strategy {
                DateParseStrategy::StructuredField => raw.published.as_ref().and_then(parse_raw),
                DateParseStrategy::DetailEndpoint => match detail_url {
                    Some(url) => self.fetch(url, strategy).await.as_deref().and_then(detail_date),
                    None => None,
                },
                DateParseStrategy::PageScan => {
                    self.fetch(page_url, strategy).await.as_deref().and_then(page_date)
                }
            };

            if let Some(parsed) = parsed {
                return PostedDate::Resolved(resolved(parsed, strategy));
            }
        }

        debug!(url = page_url, "no publication date found");
        PostedDate::Unresolved
    }

    /// `updated_at` only ever comes from the structured field.
    pub fn resolve_updated(&self, raw: &RawDateFields) -> PostedDate {
        resolve_structured(raw.updated.as_ref())
    }

    async fn fetch(&self, url: &str, strategy: DateParseStrategy) -> Option<String> {
        if url.trim().is_empty() {
            return None;
        }

        self.throttle.wait().await;
        match self.fetcher.get_text(url).await {
            Ok(body) => Some(body),
            Err(error) => {
                debug!(url, strategy = strategy.label(), %error, "date lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::http::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct StubFetch {
        bodies: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetch {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.bodies.insert(url.to_string(), body.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls mutex").clone()
        }
    }

    #[async_trait]
    impl HttpFetch for StubFetch {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().expect("calls mutex").push(url.to_string());
            self.bodies.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn resolver(fetch: Arc<StubFetch>) -> DateResolver {
        DateResolver::new(fetch, Arc::new(Throttle::new(Duration::ZERO)))
    }

    fn strategy_of(date: &PostedDate) -> Option<DateParseStrategy> {
        match date {
            PostedDate::Resolved(date) => Some(date.strategy()),
            PostedDate::Unresolved => None,
        }
    }

    #[tokio::test]
    async fn structured_field_skips_network() {
        let fetch = Arc::new(StubFetch::default());
        let raw = RawDateFields {
            published: Some(RawDate::Epoch(1_700_000_000_000)),
            updated: None,
        };

        let date = resolver(fetch.clone())
            .resolve(&raw, Some("https://detail.test/1"), "https://page.test/1")
            .await;

        assert_eq!(strategy_of(&date), Some(DateParseStrategy::StructuredField));
        assert!(fetch.calls().is_empty());
    }

    #[tokio::test]
    async fn detail_endpoint_epoch_and_iso_resolve_to_same_instant() {
        let millis = Arc::new(
            StubFetch::default().with("https://detail.test/1", r#"{"createdAt": 1700000000000}"#),
        );
        let iso = Arc::new(StubFetch::default().with(
            "https://detail.test/1",
            r#"{"createdAt": "2023-11-14T22:13:20Z"}"#,
        ));
        let raw = RawDateFields::default();

        let from_millis = resolver(millis)
            .resolve(&raw, Some("https://detail.test/1"), "https://page.test/1")
            .await;
        let from_iso = resolver(iso)
            .resolve(&raw, Some("https://detail.test/1"), "https://page.test/1")
            .await;

        assert_eq!(strategy_of(&from_millis), Some(DateParseStrategy::DetailEndpoint));
        assert_eq!(from_millis.instant(), from_iso.instant());
        assert_eq!(from_millis.storage_value(), "2023-11-14T22:13:20Z");
    }

    #[tokio::test]
    async fn falls_back_to_page_scan_after_detail_failure() {
        let fetch = Arc::new(
            StubFetch::default().with("https://page.test/1", "<p>Posted on January 9, 2024</p>"),
        );

        let date = resolver(fetch.clone())
            .resolve(
                &RawDateFields::default(),
                Some("https://detail.test/1"),
                "https://page.test/1",
            )
            .await;

        assert_eq!(strategy_of(&date), Some(DateParseStrategy::PageScan));
        assert_eq!(
            fetch.calls(),
            vec![
                "https://detail.test/1".to_string(),
                "https://page.test/1".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn exhausting_strategies_is_unresolved_not_an_error() {
        let fetch = Arc::new(StubFetch::default().with("https://page.test/1", "<p>Apply</p>"));
        let raw = RawDateFields {
            published: Some(RawDate::Text("recently".to_string())),
            updated: Some(RawDate::Text("2024-01-01".to_string())),
        };
        let resolver = resolver(fetch);

        let published = resolver.resolve(&raw, None, "https://page.test/1").await;
        assert_eq!(published, PostedDate::Unresolved);

        let updated = resolver.resolve_updated(&raw);
        assert_eq!(strategy_of(&updated), Some(DateParseStrategy::StructuredField));
    }

    #[test]
    fn strategies_run_in_fixed_order() {
        let labels: Vec<&str> = DateParseStrategy::ordered()
            .iter()
            .map(|strategy| strategy.label())
            .collect();
        assert_eq!(labels, vec!["structured_field", "detail_endpoint", "page_scan"]);
    }
}
