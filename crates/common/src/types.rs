//! Core data types for careerscan
//!
//! Postings are plain owned records so they can cross the crawler → store
//! channel without borrowing from browser state. Builder-style methods
//! consume `self` to avoid clones while a posting is being enriched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One scraped job record, keyed by its canonical `link`.
///
/// Field names match the columns of the `jobs` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_detail: Option<String>,
}

impl JobPosting {
    #[inline]
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            link: link.into(),
            description: None,
            posted_detail: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_posted_detail(mut self, posted: impl Into<String>) -> Self {
        self.posted_detail = Some(posted.into());
        self
    }

    /// Title, link and location are all present.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.link.trim().is_empty()
            && !self.location.trim().is_empty()
    }

    /// Description text, empty when the detail fetch failed or never ran.
    #[inline]
    #[must_use]
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

impl fmt::Display for JobPosting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({}) <{}>", self.title, self.company, self.location, self.link)
    }
}

/// Per-site counters for one crawl run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSummary {
    pub pages: usize,
    pub jobs: usize,
    pub upserted: usize,
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

impl SiteSummary {
    #[inline]
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Everything one site crawler hands back to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCrawl {
    pub site: String,
    pub jobs: Vec<JobPosting>,
    pub summary: SiteSummary,
}

impl SiteCrawl {
    #[must_use]
    pub fn new(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            jobs: Vec::new(),
            summary: SiteSummary::default(),
        }
    }
}

/// Crawl tuning options, passed down from the orchestrator to every crawler.
///
/// Fields stay `pub` so crawlers read them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Upper bound on listing pages per site (further capped by each profile).
    pub max_pages: usize,
    /// Detail tab pool size; `None` uses the profile default.
    pub pool_size: Option<usize>,
    pub headless: bool,
    pub block_resources: bool,
    pub navigation_timeout: Duration,
    /// Wait for listing cards to render.
    pub selector_timeout: Duration,
    /// Wait for a detail container to render.
    pub detail_timeout: Duration,
    /// How long to poll for new content after advancing a page.
    pub stability_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause before reading a freshly rendered listing page.
    pub settle_delay: Duration,
    /// Attempts per URL-paginated page before treating it as the end.
    pub page_retries: u32,
    pub retry_backoff: Duration,
    /// Capacity of the postings channel between crawlers and the store.
    pub channel_capacity: usize,
    pub store_writes_per_sec: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::balanced()
    }
}

impl CrawlConfig {
    /// Default preset.
    #[must_use]
    pub fn balanced() -> Self {
        Self {
            max_pages: 10,
            pool_size: None,
            headless: true,
            block_resources: true,
            navigation_timeout: Duration::from_secs(30),
            selector_timeout: Duration::from_secs(15),
            detail_timeout: Duration::from_secs(10),
            stability_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            page_retries: 3,
            retry_backoff: Duration::from_secs(2),
            channel_capacity: 256,
            store_writes_per_sec: 20,
        }
    }

    /// Fast preset: few pages, short waits, single attempt per page.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_pages: 3,
            selector_timeout: Duration::from_secs(8),
            detail_timeout: Duration::from_secs(5),
            stability_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_millis(250),
            page_retries: 1,
            retry_backoff: Duration::from_millis(500),
            ..Self::balanced()
        }
    }

    /// Thorough preset: deep pagination and generous timeouts.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            max_pages: 50,
            navigation_timeout: Duration::from_secs(45),
            selector_timeout: Duration::from_secs(20),
            detail_timeout: Duration::from_secs(15),
            stability_timeout: Duration::from_secs(30),
            ..Self::balanced()
        }
    }

    /// Gentle preset: small pools, slow writes, longer pauses between pages.
    #[must_use]
    pub fn gentle() -> Self {
        Self {
            pool_size: Some(2),
            settle_delay: Duration::from_secs(2),
            retry_backoff: Duration::from_secs(5),
            store_writes_per_sec: 5,
            ..Self::balanced()
        }
    }

    /// Look a preset up by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(Self::fast()),
            "balanced" => Some(Self::balanced()),
            "thorough" => Some(Self::thorough()),
            "gentle" => Some(Self::gentle()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Aggregate result of one orchestration call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Postings returned per site, before cross-site dedup.
    pub per_site: BTreeMap<String, usize>,
    /// Deduplicated postings, first occurrence wins in selection order.
    pub jobs: Vec<JobPosting>,
    pub upserted: usize,
    /// Site id (or `"store"`) to error message.
    pub errors: BTreeMap<String, String>,
    pub total: usize,
    pub summaries: BTreeMap<String, SiteSummary>,
}

impl CrawlReport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            per_site: BTreeMap::new(),
            jobs: Vec::new(),
            upserted: 0,
            errors: BTreeMap::new(),
            total: 0,
            summaries: BTreeMap::new(),
        }
    }
}

impl Default for CrawlReport {
    fn default() -> Self {
        Self::new()
    }
}

/// A posting tagged with the site that produced it.
#[derive(Debug, Clone)]
pub struct SitePosting {
    pub site: Arc<str>,
    pub posting: JobPosting,
}

/// Producer half of the postings channel, scoped to one site.
#[derive(Debug, Clone)]
pub struct JobSink {
    site: Arc<str>,
    tx: mpsc::Sender<SitePosting>,
}

impl JobSink {
    /// Bounded channel shared by all crawlers of one run.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<SitePosting>, mpsc::Receiver<SitePosting>) {
        mpsc::channel(capacity.max(1))
    }

    #[must_use]
    pub fn new(site: &str, tx: mpsc::Sender<SitePosting>) -> Self {
        Self {
            site: Arc::from(site),
            tx,
        }
    }

    /// Hand a posting to the consumer. Returns `false` once the consumer is gone.
    pub async fn send(&self, posting: JobPosting) -> bool {
        self.tx
            .send(SitePosting {
                site: Arc::clone(&self.site),
                posting,
            })
            .await
            .is_ok()
    }
}
