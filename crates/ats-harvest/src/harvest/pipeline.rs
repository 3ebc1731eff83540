use super::dates::DateResolver;
use super::filter::FilterEngine;
use super::http::{HttpFetch, PageRenderer, Throttle};
use super::listing::{sort_newest_first, Listing, RawDateFields};
use super::normalizer::normalize;
use super::report::{OrganizationCounts, OrganizationOutcome, OrganizationStatus, RunReport};
use super::sources::{adapter_for, SourceError};
use super::store::{filter_new, DedupKey, ListingStore, StoreError};
use crate::config::{HarvestConfig, OrganizationConfig};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Knobs for one run, usually taken from [`HarvestConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Organizations processed at once; `1` runs them strictly in order.
    pub concurrency: usize,
    pub organization_timeout: Duration,
    /// Replaces each backend's default throttle delay when set.
    pub request_delay: Option<Duration>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            organization_timeout: Duration::from_secs(300),
            request_delay: None,
        }
    }
}

impl From<&HarvestConfig> for PipelineSettings {
    fn from(config: &HarvestConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            organization_timeout: config.organization_timeout,
            request_delay: config.request_delay,
        }
    }
}

/// Failure of one organization's chain. Recorded in the report, never
/// propagated past the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("none of the {fetched} fetched listings could be normalized")]
    Normalization { fetched: usize },
    #[error("could not persist listings: {0}")]
    Store(#[from] StoreError),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// A filtered listing still carrying the raw date fields its source
/// reported.
struct Candidate {
    listing: Listing,
    raw_dates: RawDateFields,
}

impl DedupKey for Candidate {
    fn dedup_token(&self) -> &str {
        &self.listing.token
    }
}

pub struct Pipeline {
    fetcher: Arc<dyn HttpFetch>,
    renderer: Arc<dyn PageRenderer>,
    store: Arc<dyn ListingStore>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        renderer: Arc<dyn PageRenderer>,
        store: Arc<dyn ListingStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            store,
            settings,
        }
    }

    /// Runs every organization with bounded parallelism. Outcomes come back
    /// in the order the organizations were given.
    pub async fn run(&self, organizations: &[OrganizationConfig]) -> RunReport {
        let mut outcomes: Vec<(usize, OrganizationOutcome)> = stream::iter(
            organizations.iter().enumerate(),
        )
        .map(|(index, org)| async move { (index, self.run_organization(org).await) })
        .buffer_unordered(self.settings.concurrency.max(1))
        .collect()
        .await;

        outcomes.sort_by_key(|(index, _)| *index);
        RunReport {
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        }
    }

    /// Processes one organization under the configured timeout. Failures end
    /// up in the returned outcome.
    pub async fn run_organization(&self, org: &OrganizationConfig) -> OrganizationOutcome {
        let span = info_span!(
            "organization",
            organization = %org.name,
            backend = org.backend.slug(),
            source = org.source_kind.label()
        );

        let mut counts = OrganizationCounts::default();
        let timeout = self.settings.organization_timeout;
        let result = tokio::time::timeout(timeout, self.process(org, &mut counts))
            .instrument(span.clone())
            .await
            .unwrap_or(Err(PipelineError::Timeout(timeout)));

        let status = span.in_scope(|| match result {
            Ok(()) => OrganizationStatus::Succeeded,
            Err(PipelineError::Timeout(_)) => {
                warn!(
                    seconds = timeout.as_secs(),
                    "organization timed out, nothing persisted"
                );
                OrganizationStatus::TimedOut
            }
            Err(error) => {
                warn!(%error, "organization failed");
                OrganizationStatus::Failed {
                    reason: error.to_string(),
                }
            }
        });

        OrganizationOutcome {
            organization: org.name.clone(),
            display_name: org.display_name.clone(),
            backend: org.backend,
            source_kind: org.source_kind,
            status,
            counts,
        }
    }

    async fn process(
        &self,
        org: &OrganizationConfig,
        counts: &mut OrganizationCounts,
    ) -> Result<(), PipelineError> {
        let delay = self
            .settings
            .request_delay
            .unwrap_or_else(|| org.backend.default_request_delay());
        let throttle = Arc::new(Throttle::new(delay));
        let adapter = adapter_for(
            org,
            Arc::clone(&self.fetcher),
            Arc::clone(&self.renderer),
            Arc::clone(&throttle),
        )?;

        let raw_listings = adapter.fetch_raw_listings(org).await?;
        counts.fetched = raw_listings.len();

        let engine = FilterEngine::for_organization(org);
        let mut candidates = Vec::new();
        for raw in raw_listings {
            let listing = match normalize(&raw, org) {
                Ok(listing) => listing,
                Err(error) => {
                    counts.token_failures += 1;
                    warn!(%error, "skipping listing without token");
                    continue;
                }
            };
            counts.normalized += 1;

            let verdict = engine.evaluate(&listing);
            if verdict.is_accepted() {
                candidates.push(Candidate {
                    listing,
                    raw_dates: raw.dates,
                });
            } else {
                trace!(
                    token = %listing.token,
                    title = %listing.title,
                    verdict = verdict.label(),
                    "filtered out"
                );
            }
        }

        if counts.fetched > 0 && counts.normalized == 0 {
            return Err(PipelineError::Normalization {
                fetched: counts.fetched,
            });
        }
        counts.matched = candidates.len();

        let seen = match self.store.load(org) {
            Ok(seen) => seen,
            Err(error) => {
                warn!(%error, "StoreReadFailed: continuing with empty history");
                HashSet::new()
            }
        };
        let fresh = filter_new(candidates, &seen);
        counts.new = fresh.len();
        debug!(
            matched = counts.matched,
            known = seen.len(),
            new = counts.new,
            "deduplicated against store"
        );

        let resolver = DateResolver::new(Arc::clone(&self.fetcher), throttle);
        let mut listings = Vec::with_capacity(fresh.len());
        for Candidate {
            mut listing,
            raw_dates,
        } in fresh
        {
            let detail_url = adapter.detail_url(org, &listing.token);
            listing.published_at = resolver
                .resolve(&raw_dates, detail_url.as_deref(), &listing.url)
                .await;
            listing.updated_at = resolver.resolve_updated(&raw_dates);

            if listing.published_at.is_resolved() {
                counts.dated += 1;
            } else {
                counts.undated += 1;
                debug!(token = %listing.token, "publication date unresolved");
            }
            listings.push(listing);
        }

        sort_newest_first(&mut listings);
        let written = self.store.append(org, &listings)?;

        info!(
            fetched = counts.fetched,
            matched = counts.matched,
            new = written,
            dated = counts.dated,
            undated = counts.undated,
            "organization harvested"
        );
        Ok(())
    }
}
