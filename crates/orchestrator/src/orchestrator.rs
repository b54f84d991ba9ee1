// crates/orchestrator/src/orchestrator.rs
//! Orchestrator - concurrent site crawls and store coordination

use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use careerscan_common::{
    CareerScanError, CrawlConfig, CrawlReport, JobSink, JobStore, SiteCrawl, SiteCrawler,
    SitePosting,
};
use careerscan_sites::SiteSelection;

use crate::progress::ProgressTracker;
use crate::rate_limiter::RateLimiter;

/// What the store consumer did during one run.
#[derive(Debug, Default)]
struct StoreOutcome {
    per_site: HashMap<String, usize>,
    skipped: usize,
    error: Option<String>,
}

impl StoreOutcome {
    fn upserted(&self) -> usize {
        self.per_site.values().sum()
    }
}

/// Orchestrator runs the selected site crawlers, merges their postings and
/// streams new ones into the job store.
pub struct Orchestrator {
    crawlers: Vec<Arc<dyn SiteCrawler>>,
    store: Option<Arc<dyn JobStore>>,
    config: CrawlConfig,
    progress: Arc<ProgressTracker>,
}

impl Orchestrator {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            crawlers: Vec::new(),
            store: None,
            config,
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    /// Persist new postings into `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a crawler. A crawler with the same id replaces the earlier one.
    pub fn add_crawler(&mut self, crawler: Arc<dyn SiteCrawler>) {
        match self.crawlers.iter().position(|c| c.id() == crawler.id()) {
            Some(i) => self.crawlers[i] = crawler,
            None => self.crawlers.push(crawler),
        }
    }

    /// Registered ids in registration order.
    pub fn site_ids(&self) -> Vec<&str> {
        self.crawlers.iter().map(|c| c.id()).collect()
    }

    fn crawler(&self, id: &str) -> Option<Arc<dyn SiteCrawler>> {
        self.crawlers.iter().find(|c| c.id() == id).cloned()
    }

    /// Crawl every selected site at once and aggregate the outcome.
    ///
    /// `selector` is `"all"` or a comma-separated list of ids. Only an empty
    /// selector is an error; site and store failures land in `report.errors`.
    #[instrument(skip(self))]
    pub async fn run(&self, selector: &str) -> Result<CrawlReport> {
        let selected = SiteSelection::resolve(selector, &self.site_ids())?;
        let mut report = CrawlReport::new();
        info!("Starting crawl {} for sites: {}", report.run_id, selected.join(", "));
        self.progress.set_total(selected.len()).await;

        let (tx, consumer) = match &self.store {
            Some(store) => {
                let (tx, rx) = JobSink::channel(self.config.channel_capacity);
                let limiter = RateLimiter::new(self.config.store_writes_per_sec);
                let consumer = tokio::spawn(drain(Arc::clone(store), rx, limiter));
                (Some(tx), Some(consumer))
            }
            None => (None, None),
        };

        let mut tasks = Vec::new();
        for id in &selected {
            let Some(crawler) = self.crawler(id) else {
                warn!("Skipping {}: no crawler registered", id);
                report
                    .errors
                    .insert(id.clone(), CareerScanError::UnknownSite(id.clone()).to_string());
                continue;
            };
            let sink = tx.as_ref().map(|tx| JobSink::new(id, tx.clone()));
            let config = self.config.clone();
            let handle = tokio::spawn(async move { crawler.crawl(&config, sink).await });
            tasks.push((id.clone(), handle));
        }
        // consumer exits once every crawler's sink is gone
        drop(tx);

        let (ids, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let mut seen = HashSet::new();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            let crawl: Result<SiteCrawl> = match outcome {
                Ok(result) => result,
                Err(join_err) => Err(anyhow::anyhow!("crawler task aborted: {join_err}")),
            };
            match crawl {
                Ok(crawl) => {
                    info!("[{}] returned {} postings", id, crawl.jobs.len());
                    self.progress.site_completed(crawl.jobs.len()).await;
                    report.per_site.insert(id.clone(), crawl.jobs.len());
                    for job in crawl.jobs {
                        if seen.insert(job.link.clone()) {
                            report.jobs.push(job);
                        }
                    }
                    report.summaries.insert(id, crawl.summary);
                }
                Err(e) => {
                    warn!("[{}] crawl failed: {:#}", id, e);
                    self.progress.site_failed().await;
                    report.errors.insert(id, format!("{e:#}"));
                }
            }
        }

        if let Some(consumer) = consumer {
            match consumer.await {
                Ok(outcome) => {
                    report.upserted = outcome.upserted();
                    for (site, count) in &outcome.per_site {
                        if let Some(summary) = report.summaries.get_mut(site) {
                            summary.upserted = *count;
                        }
                    }
                    if let Some(e) = outcome.error {
                        report.errors.insert("store".to_string(), e);
                    }
                    debug!("Store skipped {} known postings", outcome.skipped);
                }
                Err(join_err) => {
                    report
                        .errors
                        .insert("store".to_string(), format!("store consumer aborted: {join_err}"));
                }
            }
        }

        report.total = report.jobs.len();
        self.progress.print_summary().await;
        info!(
            "Crawl {} finished: {} unique postings, {} upserted, {} errors",
            report.run_id,
            report.total,
            report.upserted,
            report.errors.len()
        );
        Ok(report)
    }
}

/// Single consumer: skip known links, pace writes, upsert the rest.
async fn drain(
    store: Arc<dyn JobStore>,
    mut rx: mpsc::Receiver<SitePosting>,
    limiter: RateLimiter,
) -> StoreOutcome {
    let mut outcome = StoreOutcome::default();
    let mut known = match store.existing_links().await {
        Ok(links) => {
            debug!("{} store holds {} links", store.name(), links.len());
            links
        }
        Err(e) => {
            warn!("Could not load existing links from {}: {:#}", store.name(), e);
            outcome.error = Some(format!("{e:#}"));
            HashSet::new()
        }
    };

    while let Some(SitePosting { site, posting }) = rx.recv().await {
        if known.contains(&posting.link) {
            outcome.skipped += 1;
            continue;
        }
        limiter.acquire().await;
        match store.upsert(&posting).await {
            Ok(()) => {
                careerscan_telemetry::upserted(&site);
                *outcome.per_site.entry(site.to_string()).or_default() += 1;
                known.insert(posting.link);
            }
            Err(e) => {
                careerscan_telemetry::upsert_failed(&site);
                warn!("[{}] Upsert failed for {}: {:#}", site, posting.link, e);
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use careerscan_common::JobPosting;
    use careerscan_storage::MemoryStore;

    struct StubCrawler {
        id: &'static str,
        jobs: Vec<JobPosting>,
        fail: bool,
        panic: bool,
    }

    impl StubCrawler {
        fn new(id: &'static str, links: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                id,
                jobs: links.iter().map(|l| posting(id, l)).collect(),
                fail: false,
                panic: false,
            })
        }

        fn failing(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                jobs: Vec::new(),
                fail: true,
                panic: false,
            })
        }

        fn panicking(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                jobs: Vec::new(),
                fail: false,
                panic: true,
            })
        }
    }

    #[async_trait]
    impl SiteCrawler for StubCrawler {
        fn id(&self) -> &str {
            self.id
        }

        fn company(&self) -> &str {
            self.id
        }

        async fn crawl(&self, _config: &CrawlConfig, sink: Option<JobSink>) -> Result<SiteCrawl> {
            if self.panic {
                panic!("selector engine exploded");
            }
            if self.fail {
                return Err(CareerScanError::Browser("launch failed".into()).into());
            }
            let mut out = SiteCrawl::new(self.id);
            for job in &self.jobs {
                if let Some(sink) = &sink {
                    sink.send(job.clone()).await;
                }
                out.jobs.push(job.clone());
            }
            out.summary.pages = 1;
            out.summary.jobs = out.jobs.len();
            Ok(out)
        }
    }

    fn posting(company: &str, link: &str) -> JobPosting {
        JobPosting::new("Engineer", company, "Remote", format!("https://jobs.test/{link}"))
    }

    fn links(report: &CrawlReport) -> Vec<String> {
        report.jobs.iter().map(|j| j.link.clone()).collect()
    }

    fn orchestrator(store: Option<Arc<MemoryStore>>) -> Orchestrator {
        let config = CrawlConfig {
            store_writes_per_sec: 0,
            ..CrawlConfig::default()
        };
        let mut orch = Orchestrator::new(config);
        if let Some(store) = store {
            orch = orch.with_store(store);
        }
        orch.add_crawler(StubCrawler::new("sitea", &["L1", "L2"]));
        orch.add_crawler(StubCrawler::new("siteb", &["L2", "L3"]));
        orch
    }

    #[tokio::test]
    async fn merges_and_dedups_across_sites() {
        let store = Arc::new(MemoryStore::new());
        let report = orchestrator(Some(Arc::clone(&store))).run("sitea,siteb").await.unwrap();

        assert_eq!(
            links(&report),
            vec!["https://jobs.test/L1", "https://jobs.test/L2", "https://jobs.test/L3"]
        );
        assert_eq!(report.per_site["sitea"], 2);
        assert_eq!(report.per_site["siteb"], 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.upserted, 3);
        assert!(report.errors.is_empty());

        let attributed: usize = report.summaries.values().map(|s| s.upserted).sum();
        assert_eq!(attributed, 3);
        assert_eq!(store.all_jobs().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn first_selected_site_wins() {
        let report = orchestrator(None).run("siteb,sitea").await.unwrap();
        assert_eq!(
            links(&report),
            vec!["https://jobs.test/L2", "https://jobs.test/L3", "https://jobs.test/L1"]
        );
        assert_eq!(report.jobs[0].company, "siteb");
    }

    #[tokio::test]
    async fn all_runs_in_registration_order() {
        let report = orchestrator(None).run("all").await.unwrap();
        assert_eq!(report.per_site.len(), 2);
        assert_eq!(report.jobs[0].company, "sitea");
    }

    #[tokio::test]
    async fn failing_site_does_not_abort_siblings() {
        let mut orch = orchestrator(None);
        orch.add_crawler(StubCrawler::failing("broken"));

        let report = orch.run("sitea,broken").await.unwrap();
        assert_eq!(report.per_site.len(), 1);
        assert_eq!(report.per_site["sitea"], 2);
        assert_eq!(report.total, 2);
        assert!(report.errors["broken"].contains("launch failed"));
        assert!(!report.summaries.contains_key("broken"));
    }

    #[tokio::test]
    async fn panicking_site_is_recorded() {
        let mut orch = orchestrator(None);
        orch.add_crawler(StubCrawler::panicking("wild"));

        let report = orch.run("wild,siteb").await.unwrap();
        assert!(report.errors["wild"].contains("aborted"));
        assert_eq!(report.total, 2);
    }

    #[tokio::test]
    async fn unknown_site_is_an_error_entry() {
        let report = orchestrator(None).run("sitea, Nope").await.unwrap();
        assert_eq!(report.errors["nope"], "No crawler for: nope");
        assert_eq!(report.total, 2);
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        assert!(orchestrator(None).run(" , ").await.is_err());
    }

    #[tokio::test]
    async fn without_store_nothing_is_upserted() {
        let report = orchestrator(None).run("all").await.unwrap();
        assert_eq!(report.upserted, 0);
        assert_eq!(report.total, 3);
        assert!(report.summaries.values().all(|s| s.upserted == 0));
    }

    #[tokio::test]
    async fn repeated_runs_skip_known_links() {
        let store = Arc::new(MemoryStore::new());
        let orch = orchestrator(Some(Arc::clone(&store)));

        let first = orch.run("all").await.unwrap();
        let second = orch.run("all").await.unwrap();

        assert_eq!(first.upserted, 3);
        assert_eq!(second.upserted, 0);
        assert_eq!(second.total, 3);
        assert_eq!(store.all_jobs().await.unwrap().len(), 3);
    }

    struct BrokenStore;

    #[async_trait]
    impl JobStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn upsert(&self, job: &JobPosting) -> Result<()> {
            if job.link.ends_with("L3") {
                anyhow::bail!("constraint violation");
            }
            Ok(())
        }

        async fn existing_links(&self) -> Result<HashSet<String>> {
            Err(CareerScanError::Store("select failed".into()).into())
        }

        async fn all_jobs(&self) -> Result<Vec<JobPosting>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_errors_are_recorded_not_fatal() {
        let mut orch = Orchestrator::new(CrawlConfig::default()).with_store(Arc::new(BrokenStore));
        orch.add_crawler(StubCrawler::new("sitea", &["L1", "L2", "L3"]));

        let report = orch.run("sitea").await.unwrap();
        assert!(report.errors["store"].contains("select failed"));
        assert_eq!(report.upserted, 2);
        assert_eq!(report.total, 3);
    }

    #[test]
    fn re_registering_replaces() {
        let mut orch = orchestrator(None);
        orch.add_crawler(StubCrawler::new("sitea", &["L9"]));
        assert_eq!(orch.site_ids(), vec!["sitea", "siteb"]);
    }
}
