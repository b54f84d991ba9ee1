//! Site profiles: the per-site selector table that drives the single
//! parameterized crawler.

use serde::Serialize;

use crate::types::CrawlConfig;

/// Which value on the first listing card is watched to detect that a new
/// page has rendered after clicking "next".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeMarker {
    FirstTitle,
    FirstLink,
}

/// How a site advances through its listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pagination {
    /// Click a next control in place and wait for the cards to change.
    NextButton {
        selector: &'static str,
        marker: ChangeMarker,
    },
    /// Navigate to a templated URL per page. `{page}` is 1-based,
    /// `{offset}` is `(page - 1) * page_size`.
    Url {
        template: &'static str,
        page_size: usize,
        /// Numbered pager controls on the first page. The highest number
        /// caps the page loop.
        last_page: Option<&'static str>,
    },
}

/// Where a posting's date text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostedSource {
    /// Text of an element inside the listing card.
    Card(&'static str),
    /// Text of an element on the detail page.
    Detail(&'static str),
    /// The date the crawl ran, `YYYY-MM-DD`.
    CrawlDate,
}

/// Static description of one career site.
#[derive(Debug, Clone, Serialize)]
pub struct SiteProfile {
    /// Lowercase key used for selection and error reporting.
    pub id: &'static str,
    pub company: &'static str,
    /// Base for resolving relative links.
    pub origin: &'static str,
    pub start_url: &'static str,
    pub card: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub location: &'static str,
    pub posted: Option<PostedSource>,
    pub pagination: Pagination,
    /// Detail container; `None` skips the detail phase.
    pub detail: Option<&'static str>,
    /// Text of a cookie/consent button to click after the first load.
    pub consent_text: Option<&'static str>,
    /// Regex; matching titles are not job cards.
    pub exclude_title: Option<&'static str>,
    pub max_pages: usize,
    pub pool_size: usize,
    pub block_resources: bool,
}

impl SiteProfile {
    /// URL of listing page `page` (1-based).
    #[must_use]
    pub fn page_url(&self, page: usize) -> String {
        match self.pagination {
            Pagination::NextButton { .. } => self.start_url.to_string(),
            Pagination::Url {
                template, page_size, ..
            } => {
                let page = page.max(1);
                template
                    .replace("{page}", &page.to_string())
                    .replace("{offset}", &((page - 1) * page_size).to_string())
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn effective_max_pages(&self, config: &CrawlConfig) -> usize {
        self.max_pages.min(config.max_pages)
    }

    /// Pool size for `jobs` postings: config override or profile default,
    /// at least one tab and never more tabs than postings.
    #[must_use]
    pub fn effective_pool_size(&self, config: &CrawlConfig, jobs: usize) -> usize {
        config
            .pool_size
            .unwrap_or(self.pool_size)
            .max(1)
            .min(jobs.max(1))
    }

    #[inline]
    #[must_use]
    pub fn has_detail_phase(&self) -> bool {
        self.detail.is_some()
    }
}
