// crates/browser/src/chrome.rs
//! Chrome/Chromium driver over the DevTools protocol

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use careerscan_common::{BrowserLauncher, BrowserPage, BrowserSession, CareerScanError};

/// URL patterns dropped when resource blocking is on.
const BLOCKED_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.css", "*.woff",
    "*.woff2", "*.ttf", "*.otf", "*.mp4", "*.webm",
];

/// How often `wait_for` re-queries the DOM.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Launches a local Chrome/Chromium per crawl.
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    extra_args: Vec<String>,
}

impl ChromeLauncher {
    /// Create a launcher that lets chromiumoxide locate Chrome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific browser binary.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self {
            executable: None,
            extra_args: vec!["--no-sandbox".into(), "--disable-setuid-sandbox".into()],
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    #[instrument(skip(self))]
    async fn launch(&self, headless: bool) -> Result<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &self.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(CareerScanError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CareerScanError::Browser(format!("launch failed: {e}")))?;

        // The CDP connection only makes progress while the handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("Browser launched (headless={})", headless);
        Ok(Box::new(ChromeSession {
            browser: Mutex::new(browser),
            handler: Mutex::new(Some(handler_task)),
        }))
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

/// One running browser process.
pub struct ChromeSession {
    browser: Mutex<Browser>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>> {
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CareerScanError::Browser(format!("new tab: {e}")))?;
        Ok(Box::new(ChromePage { page }))
    }

    async fn close(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

/// One tab.
pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromePage {
    #[instrument(skip(self))]
    async fn goto(&self, url: &str, limit: Duration) -> Result<()> {
        match timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CareerScanError::Navigation(format!("{url}: {e}")).into()),
            Err(_) => Err(CareerScanError::Timeout(format!("navigating to {url}")).into()),
        }
    }

    async fn wait_for(&self, selector: &str, limit: Duration) -> Result<()> {
        let deadline = Instant::now() + limit;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CareerScanError::Timeout(format!("waiting for {selector}")).into());
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| CareerScanError::Browser(format!("read content: {e}")).into())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| CareerScanError::Selector(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| CareerScanError::Browser(format!("click {selector}: {e}")))?;
        Ok(())
    }

    async fn click_text(&self, selector: &str, needle: &str) -> Result<bool> {
        let needle = needle.to_lowercase();
        let elements = match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(_) => return Ok(false),
        };
        for element in elements {
            let text = element.inner_text().await.ok().flatten().unwrap_or_default();
            if text.to_lowercase().contains(&needle) {
                element
                    .click()
                    .await
                    .map_err(|e| CareerScanError::Browser(format!("click {selector}: {e}")))?;
                debug!("Clicked '{}'", text.trim());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn block_resources(&self) -> Result<()> {
        self.page
            .execute(EnableParams::default())
            .await
            .map_err(|e| CareerScanError::Browser(format!("network enable: {e}")))?;
        let patterns: Vec<String> = BLOCKED_PATTERNS.iter().map(|p| (*p).to_string()).collect();
        self.page
            .execute(SetBlockedUrLsParams::new(patterns))
            .await
            .map_err(|e| CareerScanError::Browser(format!("block urls: {e}")))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| CareerScanError::Browser(format!("close tab: {e}")))?;
        Ok(())
    }
}
