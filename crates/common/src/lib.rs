//! careerscan common - shared types and traits
//!
//! This crate provides the data model, error taxonomy, site profile table
//! shape and the traits every other careerscan crate plugs into.

pub mod error;
pub mod profile;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CareerScanError, CareerScanResult};
pub use profile::{ChangeMarker, Pagination, PostedSource, SiteProfile};
pub use traits::{
    csv_field, jobs_to_csv, BrowserLauncher, BrowserPage, BrowserSession, JobStore, SiteCrawler,
};
pub use types::{
    CrawlConfig, CrawlReport, JobPosting, JobSink, SiteCrawl, SitePosting, SiteSummary,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
