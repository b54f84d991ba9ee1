//! Detail fetcher pool
//!
//! A fixed set of tabs reused across batches. Each batch runs one fetch per
//! tab concurrently; batches run strictly one after another.

use anyhow::Result;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, info, warn};

use careerscan_common::{
    BrowserPage, BrowserSession, CareerScanError, CrawlConfig, JobPosting, JobSink,
};

use crate::extract::{Detail, DetailExtractor};

pub struct DetailPool<'a> {
    site: String,
    pages: Vec<Box<dyn BrowserPage>>,
    extractor: &'a DetailExtractor,
    navigation_timeout: Duration,
    detail_timeout: Duration,
}

impl<'a> DetailPool<'a> {
    /// Open up to `size` tabs. Fails only if not a single tab could be opened.
    pub async fn open(
        site: &str,
        session: &dyn BrowserSession,
        size: usize,
        extractor: &'a DetailExtractor,
        config: &CrawlConfig,
        block_resources: bool,
    ) -> Result<DetailPool<'a>> {
        let mut pages = Vec::with_capacity(size);
        for _ in 0..size.max(1) {
            match session.new_page().await {
                Ok(page) => {
                    if block_resources {
                        if let Err(e) = page.block_resources().await {
                            debug!("[{}] resource blocking unavailable: {}", site, e);
                        }
                    }
                    pages.push(page);
                }
                Err(e) if !pages.is_empty() => {
                    warn!("[{}] detail pool capped at {} tabs: {}", site, pages.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            site: site.to_string(),
            pages,
            extractor,
            navigation_timeout: config.navigation_timeout,
            detail_timeout: config.detail_timeout,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.pages.len()
    }

    /// Enrich every posting, `size()` at a time. Each finished batch is
    /// forwarded to `sink` before the next one starts.
    pub async fn enrich(&self, jobs: &[JobPosting], sink: Option<&JobSink>) -> Vec<JobPosting> {
        let mut out = Vec::with_capacity(jobs.len());
        for (i, batch) in jobs.chunks(self.size()).enumerate() {
            let start = i * self.size();
            info!(
                "[{}] Scraping job details for jobs {} to {} of {}",
                self.site,
                start + 1,
                start + batch.len(),
                jobs.len()
            );
            let enriched = self.fetch_batch(batch).await;
            if let Some(sink) = sink {
                for job in &enriched {
                    sink.send(job.clone()).await;
                }
            }
            out.extend(enriched);
        }
        out
    }

    /// One concurrent fetch per tab; output order follows `batch`, which
    /// never holds more postings than there are tabs.
    async fn fetch_batch(&self, batch: &[JobPosting]) -> Vec<JobPosting> {
        let fetches = batch
            .iter()
            .zip(self.pages.iter())
            .map(|(job, page)| self.fetch_one(page.as_ref(), job.clone()));
        join_all(fetches).await
    }

    async fn fetch_one(&self, page: &dyn BrowserPage, job: JobPosting) -> JobPosting {
        match self.try_fetch(page, &job.link).await {
            Ok(detail) => {
                let mut job = job.with_description(detail.description);
                if let Some(posted) = detail.posted {
                    job = job.with_posted_detail(posted);
                }
                job
            }
            Err(e) => {
                warn!("[{}] Failed to scrape {}: {}", self.site, job.title, e);
                careerscan_telemetry::detail_failed(&self.site);
                let mut job = job.with_description("");
                if self.extractor.reads_posted() {
                    job = job.with_posted_detail("");
                }
                job
            }
        }
    }

    async fn try_fetch(&self, page: &dyn BrowserPage, link: &str) -> Result<Detail> {
        page.goto(link, self.navigation_timeout).await?;
        page.wait_for(self.extractor.container_selector(), self.detail_timeout)
            .await?;
        let html = page.html().await?;
        self.extractor
            .extract(&html)
            .ok_or_else(|| CareerScanError::Selector(format!("detail container on {link}")).into())
    }

    /// Close every tab in the pool.
    pub async fn close(self) {
        for page in self.pages {
            if let Err(e) = page.close().await {
                debug!("[{}] tab close failed: {}", self.site, e);
            }
        }
    }
}
