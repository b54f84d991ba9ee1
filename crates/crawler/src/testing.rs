//! Scripted in-memory browser for crawler tests
//!
//! Listing pages are replayed in order: clicking an enabled next control
//! moves to the following page, and stays put on the last one. Detail pages
//! are looked up by URL.

use anyhow::Result;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use careerscan_common::{BrowserLauncher, BrowserPage, BrowserSession, CareerScanError};

const BLANK: &str = "<html><body></body></html>";

#[derive(Default)]
pub struct FakeSite {
    /// `(url, html)` in page order.
    pub listings: Vec<(String, String)>,
    pub details: HashMap<String, String>,
    /// URLs whose navigation fails.
    pub failing: HashSet<String>,
    pub detail_delay: Duration,
    pub fail_launch: bool,
    /// Tabs a session may open before `new_page` starts failing.
    pub max_tabs: Option<usize>,
}

#[derive(Default)]
pub struct Probe {
    pub launches: AtomicUsize,
    pub tabs_opened: AtomicUsize,
    pub tabs_closed: AtomicUsize,
    pub blocked_tabs: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub consent_clicks: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
}

impl Probe {
    pub fn visits_to(&self, url: &str) -> usize {
        self.visited.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    probe: Arc<Probe>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            probe: Arc::new(Probe::default()),
        }
    }

    pub fn probe(&self) -> Arc<Probe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _headless: bool) -> Result<Box<dyn BrowserSession>> {
        self.probe.launches.fetch_add(1, Ordering::SeqCst);
        if self.site.fail_launch {
            return Err(CareerScanError::Browser("no chrome here".into()).into());
        }
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            probe: Arc::clone(&self.probe),
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeSession {
    site: Arc<FakeSite>,
    probe: Arc<Probe>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let opened = self.probe.tabs_opened.load(Ordering::SeqCst);
        if self.site.max_tabs.is_some_and(|max| opened >= max) {
            return Err(CareerScanError::Browser("too many tabs".into()).into());
        }
        self.probe.tabs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            site: Arc::clone(&self.site),
            probe: Arc::clone(&self.probe),
            view: Mutex::new(View::Blank),
        }))
    }

    async fn close(&self) -> Result<()> {
        self.probe.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
enum View {
    Blank,
    Listing(usize),
    Detail(String),
}

struct FakePage {
    site: Arc<FakeSite>,
    probe: Arc<Probe>,
    view: Mutex<View>,
}

impl FakePage {
    fn current(&self) -> String {
        match self.view.lock().unwrap().clone() {
            View::Blank => BLANK.to_string(),
            View::Listing(i) => self.site.listings[i].1.clone(),
            View::Detail(url) => self.site.details[&url].clone(),
        }
    }

    fn matches(&self, selector: &str) -> bool {
        let Ok(sel) = Selector::parse(selector) else {
            return false;
        };
        let html = self.current();
        let document = Html::parse_document(&html);
        let found = document.select(&sel).next().is_some();
        found
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.probe.visited.lock().unwrap().push(url.to_string());
        if self.site.failing.contains(url) {
            return Err(CareerScanError::Navigation(format!("{url}: net::ERR_FAILED")).into());
        }

        if self.site.details.contains_key(url) {
            let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.site.detail_delay).await;
            self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
            *self.view.lock().unwrap() = View::Detail(url.to_string());
            return Ok(());
        }

        let view = match self.site.listings.iter().position(|(u, _)| u == url) {
            Some(i) => View::Listing(i),
            None => View::Blank,
        };
        *self.view.lock().unwrap() = view;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<()> {
        if self.matches(selector) {
            Ok(())
        } else {
            Err(CareerScanError::Timeout(format!("waiting for {selector}")).into())
        }
    }

    async fn html(&self) -> Result<String> {
        Ok(self.current())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if !self.matches(selector) {
            return Err(CareerScanError::Selector(selector.to_string()).into());
        }
        let mut view = self.view.lock().unwrap();
        if let View::Listing(i) = *view {
            if i + 1 < self.site.listings.len() {
                *view = View::Listing(i + 1);
            }
        }
        Ok(())
    }

    async fn click_text(&self, selector: &str, needle: &str) -> Result<bool> {
        let Ok(sel) = Selector::parse(selector) else {
            return Ok(false);
        };
        let html = self.current();
        let hit = Html::parse_document(&html)
            .select(&sel)
            .any(|el| el.text().collect::<String>().to_lowercase().contains(&needle.to_lowercase()));
        if hit {
            self.probe.consent_clicks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(hit)
    }

    async fn block_resources(&self) -> Result<()> {
        self.probe.blocked_tabs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.probe.tabs_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A listing page with `.job` cards and an optional enabled next button.
pub fn listing(cards: &[(&str, &str, &str)], has_next: bool) -> String {
    let mut html = String::from("<html><body><button>Accept all cookies</button><ul>");
    for (title, href, location) in cards {
        html.push_str(&format!(
            r#"<li class="job"><h2 class="title">{title}</h2><a class="link" href="{href}">view</a><span class="loc">{location}</span></li>"#
        ));
    }
    html.push_str("</ul>");
    if has_next {
        html.push_str(r#"<button class="next">Next</button>"#);
    } else {
        html.push_str(r#"<button class="next" disabled>Next</button>"#);
    }
    html.push_str("</body></html>");
    html
}

/// A detail page with a `.desc` container and a `.posted-on` label.
pub fn detail(description: &str, posted: &str) -> String {
    format!(
        r#"<html><body><section class="desc"><p>{description}</p></section><span class="posted-on">{posted}</span></body></html>"#
    )
}
