//! Core traits for careerscan components
//!
//! The browser engine and the datastore are opaque collaborators: crawlers
//! only see `BrowserLauncher`/`BrowserSession`/`BrowserPage`, and the
//! orchestrator only sees `JobStore`.

use crate::types::{CrawlConfig, JobPosting, JobSink, SiteCrawl};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

/// One browser tab.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the load to settle, bounded by `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait until `selector` matches at least one element.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM of the current document.
    async fn html(&self) -> Result<String>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first element matching `selector` whose text contains
    /// `needle` (case-insensitive). Returns whether anything was clicked.
    async fn click_text(&self, selector: &str, needle: &str) -> Result<bool>;

    /// Stop loading images, stylesheets, fonts and media.
    async fn block_resources(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()>;
}

/// A running browser instance.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>>;

    async fn close(&self) -> Result<()>;
}

/// Starts browser sessions; each site crawl launches its own.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, headless: bool) -> Result<Box<dyn BrowserSession>>;

    fn name(&self) -> &str;
}

/// A crawler for one career site.
#[async_trait]
pub trait SiteCrawler: Send + Sync {
    /// Lowercase selection key, e.g. `"amazon"`.
    fn id(&self) -> &str;

    fn company(&self) -> &str;

    /// Crawl the site. Each newly discovered posting is also sent to `sink`
    /// once it is final for this run.
    async fn crawl(&self, config: &CrawlConfig, sink: Option<JobSink>) -> Result<SiteCrawl>;
}

/// Storage backend keyed on `JobPosting::link`.
#[async_trait]
pub trait JobStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or update the row with this posting's link.
    async fn upsert(&self, job: &JobPosting) -> Result<()>;

    /// All links currently stored.
    async fn existing_links(&self) -> Result<HashSet<String>>;

    /// All stored postings.
    async fn all_jobs(&self) -> Result<Vec<JobPosting>>;

    /// Export stored postings as CSV
    async fn export_csv(&self) -> Result<String> {
        Ok(jobs_to_csv(&self.all_jobs().await?))
    }
}

/// Header line plus one row per posting.
#[must_use]
pub fn jobs_to_csv(jobs: &[JobPosting]) -> String {
    let mut csv = String::from("title,company,location,link,posted_detail,description\n");

    for job in jobs {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&job.title),
            csv_field(&job.company),
            csv_field(&job.location),
            csv_field(&job.link),
            csv_field(job.posted_detail.as_deref().unwrap_or("")),
            csv_field(job.description_or_empty()),
        ));
    }

    csv
}

/// Quote a CSV field, doubling embedded quotes and flattening newlines.
#[must_use]
pub fn csv_field(value: &str) -> String {
    let escaped = value.replace('"', "\"\"").replace('\r', "").replace('\n', " ");
    format!("\"{}\"", escaped)
}
