#![allow(dead_code)]

use ats_harvest::config::{
    phrase_set, Backend, BoardQuery, FilterRules, LocationFallback, OrganizationConfig, SourceKind,
};
use ats_harvest::harvest::{
    CsvListingStore, FetchError, HttpFetch, PageRenderer, Pipeline, PipelineSettings,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory stand-in for the network. Unknown urls answer 404.
#[derive(Default)]
pub struct FakeWeb {
    bodies: Mutex<HashMap<String, String>>,
    stalled: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeWeb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.bodies
            .lock()
            .expect("bodies mutex")
            .insert(url.to_string(), body.into());
    }

    /// Requests to `url` never answer.
    pub fn stall(&self, url: &str) {
        self.stalled
            .lock()
            .expect("stalled mutex")
            .insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub fn calls_containing(&self, fragment: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpFetch for FakeWeb {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.calls
            .lock()
            .expect("calls mutex")
            .push(url.to_string());

        let stalled = self.stalled.lock().expect("stalled mutex").contains(url);
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        self.bodies
            .lock()
            .expect("bodies mutex")
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl PageRenderer for FakeWeb {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

pub fn engineering_rules() -> FilterRules {
    FilterRules {
        include_titles: phrase_set(["engineer", "developer"]),
        include_locations: phrase_set(["dublin", "remote", "singapore", "toronto"]),
        exclude_roles: phrase_set(["senior", "staff"]),
        exclude_locations: phrase_set(["united states"]),
    }
}

pub fn greenhouse_api(name: &str) -> OrganizationConfig {
    OrganizationConfig::new(
        name,
        Backend::Greenhouse,
        SourceKind::Api,
        engineering_rules(),
        LocationFallback::CatalogDefault,
    )
    .expect("valid greenhouse org")
}

pub fn lever_api(name: &str) -> OrganizationConfig {
    OrganizationConfig::new(
        name,
        Backend::Lever,
        SourceKind::Api,
        engineering_rules(),
        LocationFallback::CatalogDefault,
    )
    .expect("valid lever org")
}

pub fn greenhouse_board(name: &str, keywords: &[&str]) -> OrganizationConfig {
    OrganizationConfig::new(
        name,
        Backend::Greenhouse,
        SourceKind::Browser,
        engineering_rules(),
        LocationFallback::CatalogDefault,
    )
    .expect("valid board org")
    .with_board_query(BoardQuery {
        keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        office_ids: Vec::new(),
    })
}

pub fn greenhouse_jobs_url(org: &str) -> String {
    format!("https://boards-api.greenhouse.io/v1/boards/{org}/jobs")
}

pub fn greenhouse_detail_url(org: &str, token: &str) -> String {
    format!("https://job-boards.greenhouse.io/embed/job_app?for={org}&token={token}")
}

/// A Greenhouse API job. `published` becomes `first_published` when given.
pub fn greenhouse_job(id: u64, title: &str, location: &str, published: Option<&str>) -> String {
    let published = published
        .map(|value| format!(r#", "first_published": "{value}""#))
        .unwrap_or_default();
    format!(
        r#"{{"id": {id}, "title": "{title}", "absolute_url": "https://careers.test/jobs/{id}", "location": {{"name": "{location}"}}, "updated_at": "2024-06-01T12:00:00Z"{published}}}"#
    )
}

pub fn greenhouse_board_body(jobs: &[String]) -> String {
    format!(r#"{{"jobs": [{}]}}"#, jobs.join(","))
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        concurrency: 3,
        organization_timeout: Duration::from_secs(10),
        request_delay: Some(Duration::ZERO),
    }
}

pub fn pipeline(web: &Arc<FakeWeb>, root: &Path, settings: PipelineSettings) -> Pipeline {
    Pipeline::new(
        web.clone(),
        web.clone(),
        Arc::new(CsvListingStore::new(root)),
        settings,
    )
}

/// Rows of a store file as header-keyed maps.
pub fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_path(path).expect("store readable");
    let headers = reader.headers().expect("header row").clone();
    reader
        .records()
        .map(|record| {
            let record = record.expect("valid row");
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.to_string(), value.to_string()))
                .collect()
        })
        .collect()
}

pub fn column(rows: &[HashMap<String, String>], name: &str) -> Vec<String> {
    rows.iter()
        .map(|row| row.get(name).cloned().unwrap_or_default())
        .collect()
}
