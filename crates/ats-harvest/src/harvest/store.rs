use super::listing::Listing;
use crate::config::OrganizationConfig;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const STORE_COLUMNS: [&str; 9] = [
    "Company",
    "Token",
    "Title",
    "Location",
    "Team",
    "URL",
    "Date Published",
    "Local Date Published",
    "Date Updated",
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt store at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("store at {path} has no Token column")]
    MissingTokenColumn { path: PathBuf },
}

/// Append-only persistence of listings, keyed per organization.
pub trait ListingStore: Send + Sync {
    /// Tokens already persisted for `org`; a missing store is empty.
    fn load(&self, org: &OrganizationConfig) -> Result<HashSet<String>, StoreError>;

    /// Appends rows in the given order and returns how many were written.
    fn append(&self, org: &OrganizationConfig, listings: &[Listing]) -> Result<usize, StoreError>;
}

/// Anything that carries a listing's dedup token.
pub trait DedupKey {
    fn dedup_token(&self) -> &str;
}

impl DedupKey for Listing {
    fn dedup_token(&self) -> &str {
        &self.token
    }
}

/// Keeps items whose token is neither in `seen` nor repeated earlier in the
/// batch. Order is preserved.
pub fn filter_new<T: DedupKey>(items: Vec<T>, seen: &HashSet<String>) -> Vec<T> {
    let mut batch: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let token = item.dedup_token();
            !seen.contains(token) && batch.insert(token.to_string())
        })
        .collect()
}

/// One CSV file per organization under a root directory.
#[derive(Debug, Clone)]
pub struct CsvListingStore {
    root: PathBuf,
}

impl CsvListingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, org: &OrganizationConfig) -> PathBuf {
        self.root.join(format!("{}_jobs.csv", org.store_key()))
    }
}

impl ListingStore for CsvListingStore {
    fn load(&self, org: &OrganizationConfig) -> Result<HashSet<String>, StoreError> {
        let path = self.path_for(org);
        if !path.exists() {
            return Ok(HashSet::new());
        }

        let csv_error = |source| StoreError::Csv {
            path: path.clone(),
            source,
        };
        let mut reader = csv::Reader::from_path(&path).map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.is_empty() {
            return Ok(HashSet::new());
        }

        let column = headers
            .iter()
            .position(|header| header.trim() == "Token")
            .ok_or_else(|| StoreError::MissingTokenColumn { path: path.clone() })?;

        let mut tokens = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            if let Some(token) = record.get(column) {
                let token = token.trim();
                if !token.is_empty() {
                    tokens.insert(token.to_string());
                }
            }
        }

        Ok(tokens)
    }

    fn append(&self, org: &OrganizationConfig, listings: &[Listing]) -> Result<usize, StoreError> {
        if listings.is_empty() {
            return Ok(0);
        }

        let path = self.path_for(org);
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let csv_error = |source| StoreError::Csv {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let needs_header = fs::metadata(&path)
            .map(|metadata| metadata.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(STORE_COLUMNS).map_err(csv_error)?;
        }

        for listing in listings {
            let published = listing.published_at.storage_value();
            let published_local = listing.published_at.local_value();
            let updated = listing.updated_at.storage_value();
            writer
                .write_record([
                    listing.company.as_str(),
                    listing.token.as_str(),
                    listing.title.as_str(),
                    listing.location.as_str(),
                    listing.team.as_deref().unwrap_or(""),
                    listing.url.as_str(),
                    published.as_str(),
                    published_local.as_str(),
                    updated.as_str(),
                ])
                .map_err(csv_error)?;
        }

        writer.flush().map_err(io_error)?;
        Ok(listings.len())
    }
}
