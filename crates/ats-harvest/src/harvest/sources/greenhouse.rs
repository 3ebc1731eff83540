use super::{
    endpoints_for, first_available, id_string, null_as_default, SourceAdapter, SourceError,
};
use crate::config::OrganizationConfig;
use crate::harvest::http::{parse_json, FetchError, HttpFetch, Throttle};
use crate::harvest::listing::{RawDate, RawDateFields, RawListing};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const ENDPOINTS: &[(&str, bool)] = &[
    ("https://boards-api.greenhouse.io/v1/boards/{org}/jobs", false),
    ("https://api.greenhouse.io/v1/boards/{org}/jobs", false),
];

/// Embedded application page; its markup carries `published_at`.
pub(crate) const DETAIL_TEMPLATE: &str =
    "https://job-boards.greenhouse.io/embed/job_app?for={org}&token={token}";

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    jobs: Vec<JobPayload>,
}

#[derive(Debug, Deserialize)]
struct JobPayload {
    #[serde(default)]
    id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    absolute_url: String,
    #[serde(default)]
    location: Option<LocationPayload>,
    #[serde(default)]
    first_published: Value,
    #[serde(default)]
    updated_at: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    departments: Vec<DepartmentPayload>,
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct DepartmentPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
}

impl From<JobPayload> for RawListing {
    fn from(job: JobPayload) -> Self {
        RawListing {
            title: job.title,
            locations: job.location.map(|location| location.name).into_iter().collect(),
            url: job.absolute_url,
            source_id: id_string(&job.id),
            team: job
                .departments
                .into_iter()
                .map(|department| department.name)
                .find(|name| !name.trim().is_empty()),
            dates: RawDateFields {
                published: RawDate::from_json(&job.first_published),
                updated: RawDate::from_json(&job.updated_at),
            },
        }
    }
}

/// Greenhouse's public job board API. The whole board comes back in one
/// response, so there is no paging.
pub struct GreenhouseApiAdapter {
    fetcher: Arc<dyn HttpFetch>,
    throttle: Arc<Throttle>,
}

impl GreenhouseApiAdapter {
    pub fn new(fetcher: Arc<dyn HttpFetch>, throttle: Arc<Throttle>) -> Self {
        Self { fetcher, throttle }
    }

    async fn fetch_board(&self, url: String) -> Result<Vec<RawListing>, FetchError> {
        self.throttle.wait().await;
        let body = self.fetcher.get_text(&url).await?;
        let response: JobsResponse = parse_json(&url, &body)?;
        Ok(response.jobs.into_iter().map(RawListing::from).collect())
    }
}

#[async_trait]
impl SourceAdapter for GreenhouseApiAdapter {
    async fn fetch_raw_listings(
        &self,
        org: &OrganizationConfig,
    ) -> Result<Vec<RawListing>, SourceError> {
        let endpoints = endpoints_for(org, ENDPOINTS);
        first_available(org, endpoints, |endpoint| self.fetch_board(endpoint.url)).await
    }

    fn detail_url(&self, org: &OrganizationConfig, token: &str) -> Option<String> {
        Some(org.expand(DETAIL_TEMPLATE).replace("{token}", token))
    }
}
