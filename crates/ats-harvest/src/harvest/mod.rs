//! The harvest pipeline: fetch from each organization's source, normalize,
//! filter, drop already-stored listings, resolve dates and append.

pub mod dates;
pub mod filter;
pub mod http;
pub mod listing;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod store;

pub use dates::{DateParseStrategy, DateResolver};
pub use filter::{FilterEngine, FilterVerdict};
pub use http::{FetchError, HttpFetch, HttpPageRenderer, PageRenderer, ReqwestFetcher, Throttle};
pub use listing::{
    sort_newest_first, Listing, PostedDate, RawDate, RawDateFields, RawListing, ResolvedDate,
    UNRESOLVED_SENTINEL,
};
pub use normalizer::{normalize, NormalizeError, LOCATION_NOT_SPECIFIED};
pub use pipeline::{Pipeline, PipelineError, PipelineSettings};
pub use report::{OrganizationCounts, OrganizationOutcome, OrganizationStatus, RunReport, RunSummary};
pub use sources::{adapter_for, SourceAdapter, SourceError};
pub use store::{filter_new, CsvListingStore, DedupKey, ListingStore, StoreError};
