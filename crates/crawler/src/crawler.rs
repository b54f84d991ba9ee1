// crates/crawler/src/crawler.rs
//! Profile-driven site crawler

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use careerscan_common::{
    BrowserLauncher, BrowserPage, BrowserSession, CareerScanError, ChangeMarker, CrawlConfig,
    JobPosting, JobSink, Pagination, SiteCrawl, SiteCrawler, SiteProfile,
};

use crate::detail::DetailPool;
use crate::extract::{compile, has_element, highest_page_number, DetailExtractor, ListingExtractor};

/// One crawler implementation for every site; behaviour comes from the profile.
pub struct ProfileCrawler {
    profile: SiteProfile,
    launcher: Arc<dyn BrowserLauncher>,
    listing: ListingExtractor,
    detail: Option<DetailExtractor>,
    next: Option<Selector>,
    last_page: Option<Selector>,
}

/// Mutable state of one crawl.
struct Collector {
    seen: HashSet<String>,
    jobs: Vec<JobPosting>,
    stream_on_discovery: bool,
}

impl Collector {
    /// Keep postings with unseen links. Returns how many were added.
    async fn admit(&mut self, found: Vec<JobPosting>, sink: Option<&JobSink>) -> usize {
        let mut added = 0;
        for job in found {
            if !job.is_complete() || self.seen.contains(&job.link) {
                continue;
            }
            self.seen.insert(job.link.clone());
            if self.stream_on_discovery {
                if let Some(sink) = sink {
                    sink.send(job.clone()).await;
                }
            }
            self.jobs.push(job);
            added += 1;
        }
        added
    }
}

impl ProfileCrawler {
    /// Compile the profile's selectors.
    pub fn new(profile: SiteProfile, launcher: Arc<dyn BrowserLauncher>) -> Result<Self> {
        let listing = ListingExtractor::new(&profile)
            .with_context(|| format!("invalid listing selectors for {}", profile.id))?;
        let detail = DetailExtractor::for_profile(&profile)
            .with_context(|| format!("invalid detail selectors for {}", profile.id))?;
        let (next, last_page) = match profile.pagination {
            Pagination::NextButton { selector, .. } => (Some(compile(selector)?), None),
            Pagination::Url { last_page, .. } => (None, last_page.map(compile).transpose()?),
        };
        Ok(Self {
            profile,
            launcher,
            listing,
            detail,
            next,
            last_page,
        })
    }

    fn today() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    async fn prepare_tab(&self, page: &dyn BrowserPage, config: &CrawlConfig) {
        if self.profile.block_resources && config.block_resources {
            if let Err(e) = page.block_resources().await {
                debug!("[{}] resource blocking unavailable: {}", self.profile.id, e);
            }
        }
    }

    /// Click a consent button if the profile names one. Failures are ignored.
    async fn accept_consent(&self, page: &dyn BrowserPage, config: &CrawlConfig) {
        let Some(text) = self.profile.consent_text else {
            return;
        };
        match page.click_text("button", text).await {
            Ok(true) => {
                debug!("[{}] consent accepted", self.profile.id);
                sleep(config.settle_delay).await;
            }
            Ok(false) => debug!("[{}] no consent button", self.profile.id),
            Err(e) => debug!("[{}] consent click failed: {}", self.profile.id, e),
        }
    }

    /// Listing phase followed by the optional detail phase.
    async fn run(
        &self,
        session: &dyn BrowserSession,
        config: &CrawlConfig,
        sink: Option<&JobSink>,
        out: &mut SiteCrawl,
    ) -> Result<()> {
        let page = session
            .new_page()
            .await
            .with_context(|| format!("[{}] could not open listing tab", self.profile.id))?;
        self.prepare_tab(page.as_ref(), config).await;

        let mut collector = Collector {
            seen: HashSet::new(),
            jobs: Vec::new(),
            stream_on_discovery: self.detail.is_none(),
        };

        let listed = match self.profile.pagination {
            Pagination::NextButton { marker, .. } => {
                self.paginate_in_place(page.as_ref(), marker, config, sink, &mut collector, out)
                    .await
            }
            Pagination::Url { .. } => {
                self.paginate_by_url(page.as_ref(), config, sink, &mut collector, out)
                    .await;
                Ok(())
            }
        };
        if let Err(e) = page.close().await {
            debug!("[{}] listing tab close failed: {}", self.profile.id, e);
        }
        listed?;

        out.summary.jobs = collector.jobs.len();
        info!(
            "[{}] Finished reading pages. Total jobs before detail scraping: {}",
            self.profile.id,
            collector.jobs.len()
        );

        match &self.detail {
            Some(extractor) if !collector.jobs.is_empty() => {
                out.jobs = self
                    .fetch_details(session, extractor, collector.jobs, config, sink)
                    .await;
            }
            _ => out.jobs = collector.jobs,
        }
        Ok(())
    }

    /// Click-through pagination on a single tab.
    async fn paginate_in_place(
        &self,
        page: &dyn BrowserPage,
        marker: ChangeMarker,
        config: &CrawlConfig,
        sink: Option<&JobSink>,
        collector: &mut Collector,
        out: &mut SiteCrawl,
    ) -> Result<()> {
        let id = self.profile.id;
        let max_pages = self.profile.effective_max_pages(config);
        let today = Self::today();

        page.goto(self.profile.start_url, config.navigation_timeout)
            .await
            .with_context(|| format!("[{id}] listing page did not load"))?;
        self.accept_consent(page, config).await;

        let mut page_num = 1;
        while page_num <= max_pages {
            if let Err(e) = page.wait_for(self.profile.card, config.selector_timeout).await {
                info!("[{}] No job cards on page {} ({}). Stopping.", id, page_num, e);
                break;
            }
            sleep(config.settle_delay).await;

            let html = match page.html().await {
                Ok(html) => html,
                Err(e) => {
                    out.summary.record_error(format!("Page {page_num}: {e}"));
                    break;
                }
            };

            let found = self.listing.extract(&html, &today);
            let found_count = found.len();
            let added = collector.admit(found, sink).await;
            out.summary.pages += 1;
            careerscan_telemetry::page_visited(id);
            careerscan_telemetry::postings_found(id, added);
            info!(
                "[{}] Found {} jobs on page {}. Added {} new jobs. Total so far: {}",
                id,
                found_count,
                page_num,
                added,
                collector.jobs.len()
            );

            if page_num >= max_pages {
                info!("[{}] Reached page limit ({}). Stopping pagination.", id, max_pages);
                break;
            }

            let Some(next) = self.next.as_ref() else {
                break;
            };
            if !has_element(&html, next) {
                info!("[{}] No next page found. Finished reading all pages.", id);
                break;
            }

            let before = self.listing.marker(&html, marker);
            let Pagination::NextButton { selector, .. } = self.profile.pagination else {
                break;
            };
            if let Err(e) = page.click(selector).await {
                warn!("[{}] Next page click failed on page {}: {}", id, page_num, e);
                break;
            }
            if !self.wait_for_change(page, before, marker, config).await {
                warn!(
                    "[{}] Page {} did not render new jobs within {:?}. Keeping what was collected.",
                    id,
                    page_num + 1,
                    config.stability_timeout
                );
                break;
            }
            page_num += 1;
        }
        Ok(())
    }

    /// Poll until the first card's marker differs from `before`.
    async fn wait_for_change(
        &self,
        page: &dyn BrowserPage,
        before: Option<String>,
        marker: ChangeMarker,
        config: &CrawlConfig,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + config.stability_timeout;
        loop {
            sleep(config.poll_interval).await;
            if let Ok(html) = page.html().await {
                if let Some(now) = self.listing.marker(&html, marker) {
                    if before.as_deref() != Some(now.as_str()) {
                        return true;
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
        }
    }

    /// URL-template pagination with a fixed retry count per page. A page
    /// that loads without cards ends the listing.
    async fn paginate_by_url(
        &self,
        page: &dyn BrowserPage,
        config: &CrawlConfig,
        sink: Option<&JobSink>,
        collector: &mut Collector,
        out: &mut SiteCrawl,
    ) {
        let id = self.profile.id;
        let mut max_pages = self.profile.effective_max_pages(config);
        let attempts = config.page_retries.max(1);
        let today = Self::today();

        let mut page_num = 1;
        while page_num <= max_pages {
            let url = self.profile.page_url(page_num);
            let mut loaded = None;
            for attempt in 1..=attempts {
                match self.load_listing(page, &url, config).await {
                    Ok(body) => {
                        loaded = Some(body);
                        break;
                    }
                    Err(e) => {
                        out.summary
                            .record_error(format!("Page {page_num} retry {attempt}: {e}"));
                        if attempt == attempts || !CareerScanError::is_transient_error(&e) {
                            break;
                        }
                        sleep(config.retry_backoff).await;
                    }
                }
            }
            let html = match loaded {
                Some(Some(html)) => html,
                Some(None) => {
                    info!("[{}] No job cards on page {}. Finished reading all pages.", id, page_num);
                    break;
                }
                None => {
                    warn!("[{}] Failed to load jobs on page {} after retries.", id, page_num);
                    break;
                }
            };
            if page_num == 1 {
                self.accept_consent(page, config).await;
                let detected = self
                    .last_page
                    .as_ref()
                    .and_then(|sel| highest_page_number(&html, sel));
                if let Some(last) = detected {
                    info!("[{}] Detected total pages: {}", id, last);
                    max_pages = max_pages.min(last.max(1));
                }
            }

            let found = self.listing.extract(&html, &today);
            let found_count = found.len();
            let added = collector.admit(found, sink).await;
            out.summary.pages += 1;
            careerscan_telemetry::page_visited(id);
            careerscan_telemetry::postings_found(id, added);
            info!(
                "[{}] Found {} jobs on page {}. Added {} new jobs. Total so far: {}",
                id,
                found_count,
                page_num,
                added,
                collector.jobs.len()
            );

            if found_count == 0 {
                break;
            }
            page_num += 1;
        }
    }

    /// `Ok(None)` when the page loaded but no card showed up in time.
    async fn load_listing(
        &self,
        page: &dyn BrowserPage,
        url: &str,
        config: &CrawlConfig,
    ) -> Result<Option<String>> {
        page.goto(url, config.navigation_timeout).await?;
        if let Err(e) = page.wait_for(self.profile.card, config.selector_timeout).await {
            return match e.downcast_ref::<CareerScanError>() {
                Some(CareerScanError::Timeout(_)) => Ok(None),
                _ => Err(e),
            };
        }
        sleep(config.settle_delay).await;
        page.html().await.map(Some)
    }

    /// Enrich postings batch by batch, streaming each batch once it is final.
    async fn fetch_details(
        &self,
        session: &dyn BrowserSession,
        extractor: &DetailExtractor,
        jobs: Vec<JobPosting>,
        config: &CrawlConfig,
        sink: Option<&JobSink>,
    ) -> Vec<JobPosting> {
        let id = self.profile.id;
        let size = self.profile.effective_pool_size(config, jobs.len());
        let block = self.profile.block_resources && config.block_resources;

        let pool = match DetailPool::open(id, session, size, extractor, config, block).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("[{}] Detail pool unavailable, keeping summaries: {}", id, e);
                let fallback: Vec<JobPosting> =
                    jobs.into_iter().map(|j| j.with_description("")).collect();
                if let Some(sink) = sink {
                    for job in &fallback {
                        sink.send(job.clone()).await;
                    }
                }
                return fallback;
            }
        };

        let out = pool.enrich(&jobs, sink).await;
        pool.close().await;
        out
    }
}

#[async_trait]
impl SiteCrawler for ProfileCrawler {
    fn id(&self) -> &str {
        self.profile.id
    }

    fn company(&self) -> &str {
        self.profile.company
    }

    #[instrument(skip(self, config, sink), fields(site = self.profile.id))]
    async fn crawl(&self, config: &CrawlConfig, sink: Option<JobSink>) -> Result<SiteCrawl> {
        info!("--- Starting {} crawler ---", self.profile.company);
        let started = Instant::now();
        let session = self
            .launcher
            .launch(config.headless)
            .await
            .with_context(|| format!("[{}] browser launch failed", self.profile.id))?;

        let mut out = SiteCrawl::new(self.profile.id);
        let result = self.run(session.as_ref(), config, sink.as_ref(), &mut out).await;

        if let Err(e) = session.close().await {
            warn!("[{}] browser close failed: {}", self.profile.id, e);
        }
        result?;

        out.summary.elapsed = started.elapsed();
        info!(
            "--- {} crawler finished: {} jobs from {} pages in {:?} ---",
            self.profile.company,
            out.jobs.len(),
            out.summary.pages,
            out.summary.elapsed
        );
        Ok(out)
    }
}

/// Build one crawler per profile, sharing a launcher.
pub fn crawlers_for(
    profiles: &[SiteProfile],
    launcher: Arc<dyn BrowserLauncher>,
) -> Result<Vec<Arc<dyn SiteCrawler>>> {
    profiles
        .iter()
        .map(|p| {
            ProfileCrawler::new(p.clone(), Arc::clone(&launcher))
                .map(|c| Arc::new(c) as Arc<dyn SiteCrawler>)
        })
        .collect()
}
