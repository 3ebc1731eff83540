use super::{
    endpoints_for, first_available, id_string, null_as_default, Endpoint, SourceAdapter,
    SourceError, MAX_PAGES,
};
use crate::config::OrganizationConfig;
use crate::harvest::http::{parse_json, with_query, FetchError, HttpFetch, Throttle};
use crate::harvest::listing::{RawDate, RawDateFields, RawListing};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

const PAGE_SIZE: usize = 100;

const ENDPOINTS: &[(&str, bool)] = &[
    ("https://api.lever.co/v0/postings/{org}?mode=json", true),
    ("https://api.lever.co/v0/postings/{org}", false),
];

const DETAIL_TEMPLATE: &str = "https://api.lever.co/v0/postings/{org}/{token}";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostingPayload {
    #[serde(default)]
    id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    hosted_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    categories: CategoriesPayload,
    #[serde(default)]
    created_at: Value,
    #[serde(default)]
    updated_at: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoriesPayload {
    #[serde(default)]
    location: Value,
    #[serde(default)]
    all_locations: Value,
    #[serde(default)]
    team: Value,
}

/// Lever reports some category fields as either a string or a list.
fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

impl From<PostingPayload> for RawListing {
    fn from(posting: PostingPayload) -> Self {
        let mut locations = strings(&posting.categories.all_locations);
        if locations.is_empty() {
            locations = strings(&posting.categories.location);
        }

        RawListing {
            title: posting.text,
            locations,
            url: posting.hosted_url,
            source_id: id_string(&posting.id),
            team: strings(&posting.categories.team)
                .into_iter()
                .find(|team| !team.trim().is_empty()),
            dates: RawDateFields {
                published: RawDate::from_json(&posting.created_at),
                updated: RawDate::from_json(&posting.updated_at),
            },
        }
    }
}

/// Lever's public postings API, paged with `skip`/`limit`.
pub struct LeverApiAdapter {
    fetcher: Arc<dyn HttpFetch>,
    throttle: Arc<Throttle>,
}

impl LeverApiAdapter {
    pub fn new(fetcher: Arc<dyn HttpFetch>, throttle: Arc<Throttle>) -> Self {
        Self { fetcher, throttle }
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<PostingPayload>, FetchError> {
        self.throttle.wait().await;
        let body = self.fetcher.get_text(url).await?;
        parse_json(url, &body)
    }

    async fn fetch_endpoint(&self, endpoint: Endpoint) -> Result<Vec<RawListing>, FetchError> {
        if !endpoint.paged {
            let postings = self.fetch_page(&endpoint.url).await?;
            return Ok(postings.into_iter().map(RawListing::from).collect());
        }

        let mut listings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for page in 0..MAX_PAGES {
            let url = with_query(
                &endpoint.url,
                &[
                    ("skip", (page * PAGE_SIZE).to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ],
            )?;

            let postings = match self.fetch_page(&url).await {
                Ok(postings) => postings,
                Err(error) if page == 0 => return Err(error),
                Err(error) => {
                    warn!(%url, %error, "stopping pagination after failed page");
                    break;
                }
            };

            let received = postings.len();
            let mut fresh = 0;
            for posting in postings {
                let listing = RawListing::from(posting);
                let key = listing.source_id.clone().unwrap_or_else(|| listing.url.clone());
                if seen.insert(key) {
                    fresh += 1;
                    listings.push(listing);
                }
            }

            // A backend that ignores `skip` repeats the same page forever.
            if received < PAGE_SIZE || fresh == 0 {
                break;
            }
        }

        Ok(listings)
    }
}

#[async_trait]
impl SourceAdapter for LeverApiAdapter {
    async fn fetch_raw_listings(
        &self,
        org: &OrganizationConfig,
    ) -> Result<Vec<RawListing>, SourceError> {
        let endpoints = endpoints_for(org, ENDPOINTS);
        first_available(org, endpoints, |endpoint| self.fetch_endpoint(endpoint)).await
    }

    fn detail_url(&self, org: &OrganizationConfig, token: &str) -> Option<String> {
        Some(org.expand(DETAIL_TEMPLATE).replace("{token}", token))
    }
}
