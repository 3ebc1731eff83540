use crate::cli::RunArgs;
use ats_harvest::config::{ConfigError, HarvestConfig, OrganizationCatalog};
use ats_harvest::error::AppError;
use ats_harvest::harvest::{
    CsvListingStore, HttpFetch, HttpPageRenderer, Pipeline, PipelineSettings, ReqwestFetcher,
};
use std::path::Path;
use std::sync::Arc;

/// CLI flags win over environment configuration.
pub(crate) fn apply_overrides(config: &mut HarvestConfig, args: &RunArgs) -> Result<(), AppError> {
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency.into());
        }
        config.concurrency = concurrency;
    }
    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    Ok(())
}

pub(crate) fn load_catalog(path: Option<&Path>) -> Result<OrganizationCatalog, AppError> {
    let catalog = match path {
        Some(path) => OrganizationCatalog::from_path(path)?,
        None => OrganizationCatalog::builtin()?,
    };
    Ok(catalog)
}

pub(crate) fn build_pipeline(config: &HarvestConfig) -> Result<Pipeline, AppError> {
    let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(config.http_timeout)?);
    let renderer = Arc::new(HttpPageRenderer::new(Arc::clone(&fetcher)));
    let store = Arc::new(CsvListingStore::new(&config.output_dir));

    Ok(Pipeline::new(
        fetcher,
        renderer,
        store,
        PipelineSettings::from(config),
    ))
}
