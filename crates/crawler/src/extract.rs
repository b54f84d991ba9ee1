//! Listing and detail extraction from rendered HTML
//!
//! Everything here is synchronous: the crawler fetches the serialized DOM
//! from the browser and parses it locally, so no parsed document is ever
//! held across an await point.

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use careerscan_common::{CareerScanError, ChangeMarker, JobPosting, PostedSource, SiteProfile};

/// Compile a CSS selector, naming it in the error.
pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CareerScanError::Selector(format!("'{selector}': {e}")).into())
}

/// Text of an element with whitespace runs collapsed to single spaces.
pub fn inline_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of an element as trimmed, non-empty lines.
pub fn block_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve `href` against `origin`, dropping the fragment.
/// Only http(s) links are accepted.
pub fn normalize_link(origin: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = origin.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Reads job cards off a listing page.
pub struct ListingExtractor {
    company: String,
    origin: Url,
    card: Selector,
    title: Selector,
    link: Selector,
    location: Selector,
    posted: Option<Selector>,
    stamp_crawl_date: bool,
    exclude: Option<Regex>,
}

impl ListingExtractor {
    pub fn new(profile: &SiteProfile) -> Result<Self> {
        let origin = Url::parse(profile.origin)
            .map_err(|e| CareerScanError::Config(format!("{} origin: {e}", profile.id)))?;
        let posted = match profile.posted {
            Some(PostedSource::Card(sel)) => Some(compile(sel)?),
            _ => None,
        };
        let exclude = profile
            .exclude_title
            .map(Regex::new)
            .transpose()
            .map_err(|e| CareerScanError::Config(format!("{} exclude pattern: {e}", profile.id)))?;

        Ok(Self {
            company: profile.company.to_string(),
            origin,
            card: compile(profile.card)?,
            title: compile(profile.title)?,
            link: compile(profile.link)?,
            location: compile(profile.location)?,
            posted,
            stamp_crawl_date: matches!(profile.posted, Some(PostedSource::CrawlDate)),
            exclude,
        })
    }

    /// Complete postings on the page, in document order. Cards missing a
    /// title, link or location are dropped, as are excluded titles.
    pub fn extract(&self, html: &str, today: &str) -> Vec<JobPosting> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .filter_map(|card| self.card_posting(&card, today))
            .collect()
    }

    fn card_posting(&self, card: &ElementRef<'_>, today: &str) -> Option<JobPosting> {
        let title = card.select(&self.title).next().map(|el| inline_text(&el))?;
        let href = match card.select(&self.link).next() {
            Some(el) => el.value().attr("href")?,
            None if card.value().name() == "a" => card.value().attr("href")?,
            None => return None,
        };
        let link = normalize_link(&self.origin, href)?;
        let location = card.select(&self.location).next().map(|el| inline_text(&el))?;

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(&title) {
                return None;
            }
        }

        let mut posting = JobPosting::new(title, self.company.as_str(), location, link);
        if let Some(sel) = &self.posted {
            if let Some(el) = card.select(sel).next() {
                posting = posting.with_posted_detail(inline_text(&el));
            }
        } else if self.stamp_crawl_date {
            posting = posting.with_posted_detail(today);
        }

        posting.is_complete().then_some(posting)
    }

    /// Value watched by the stability wait: the first card's title or link.
    pub fn marker(&self, html: &str, marker: ChangeMarker) -> Option<String> {
        let document = Html::parse_document(html);
        let card = document.select(&self.card).next()?;
        let value = match marker {
            ChangeMarker::FirstTitle => card.select(&self.title).next().map(|el| inline_text(&el)),
            ChangeMarker::FirstLink => card
                .select(&self.link)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| normalize_link(&self.origin, href)),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Whether any element matches `selector`.
pub fn has_element(html: &str, selector: &Selector) -> bool {
    Html::parse_document(html).select(selector).next().is_some()
}

/// Highest all-digit label among the elements matching `selector`.
pub fn highest_page_number(html: &str, selector: &Selector) -> Option<usize> {
    Html::parse_document(html)
        .select(selector)
        .filter_map(|el| inline_text(&el).parse::<usize>().ok())
        .max()
}

/// Reads the description (and optionally a posted date) off a detail page.
pub struct DetailExtractor {
    container_css: &'static str,
    container: Selector,
    posted: Option<Selector>,
}

/// Text pulled from one detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub description: String,
    pub posted: Option<String>,
}

impl DetailExtractor {
    /// `None` when the profile has no detail phase.
    pub fn for_profile(profile: &SiteProfile) -> Result<Option<Self>> {
        let Some(container) = profile.detail else {
            return Ok(None);
        };
        let posted = match profile.posted {
            Some(PostedSource::Detail(sel)) => Some(compile(sel)?),
            _ => None,
        };
        Ok(Some(Self {
            container_css: container,
            container: compile(container)?,
            posted,
        }))
    }

    /// The container selector as written in the profile, for browser waits.
    #[inline]
    pub fn container_selector(&self) -> &str {
        self.container_css
    }

    /// Whether posted text comes from this page.
    #[inline]
    pub fn reads_posted(&self) -> bool {
        self.posted.is_some()
    }

    /// `None` when the container is absent.
    pub fn extract(&self, html: &str) -> Option<Detail> {
        let document = Html::parse_document(html);
        let container = document.select(&self.container).next()?;
        let posted = self.posted.as_ref().map(|sel| {
            document
                .select(sel)
                .next()
                .map(|el| inline_text(&el))
                .unwrap_or_default()
        });
        Some(Detail {
            description: block_text(&container),
            posted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerscan_common::Pagination;

    fn profile() -> SiteProfile {
        SiteProfile {
            id: "acme",
            company: "Acme",
            origin: "https://jobs.acme.test",
            start_url: "https://jobs.acme.test/search",
            card: ".job",
            title: ".title",
            link: "a.link",
            location: ".loc",
            posted: Some(PostedSource::Card(".posted")),
            pagination: Pagination::NextButton {
                selector: ".next:not([disabled])",
                marker: ChangeMarker::FirstTitle,
            },
            detail: Some(".desc"),
            consent_text: None,
            exclude_title: Some(r"(?i)featured story"),
            max_pages: 10,
            pool_size: 2,
            block_resources: false,
        }
    }

    const LISTING: &str = r#"
        <html><body>
          <div class="job">
            <h2 class="title">  Senior   Engineer </h2>
            <a class="link" href="/jobs/1#apply">view</a>
            <span class="loc">Pune,
              India</span>
            <span class="posted">3 days ago</span>
          </div>
          <div class="job">
            <h2 class="title">No location</h2>
            <a class="link" href="/jobs/2">view</a>
          </div>
          <div class="job">
            <h2 class="title">Featured Story: our culture</h2>
            <a class="link" href="/stories/1">read</a>
            <span class="loc">Everywhere</span>
          </div>
          <div class="job">
            <h2 class="title">Analyst</h2>
            <a class="link" href="https://other.test/jobs/3">view</a>
            <span class="loc">Remote</span>
          </div>
          <div class="job">
            <h2 class="title">Script</h2>
            <a class="link" href="javascript:void(0)">view</a>
            <span class="loc">Remote</span>
          </div>
          <button class="next" disabled>Next</button>
        </body></html>"#;

    #[test]
    fn extracts_complete_cards_only() {
        let ex = ListingExtractor::new(&profile()).unwrap();
        let jobs = ex.extract(LISTING, "2026-01-01");

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Senior Engineer");
        assert_eq!(jobs[0].location, "Pune, India");
        assert_eq!(jobs[0].link, "https://jobs.acme.test/jobs/1");
        assert_eq!(jobs[0].company, "Acme");
        assert_eq!(jobs[0].posted_detail.as_deref(), Some("3 days ago"));
        assert_eq!(jobs[1].link, "https://other.test/jobs/3");
        assert!(jobs.iter().all(JobPosting::is_complete));
    }

    #[test]
    fn crawl_date_stamp() {
        let mut p = profile();
        p.posted = Some(PostedSource::CrawlDate);
        let ex = ListingExtractor::new(&p).unwrap();
        let jobs = ex.extract(LISTING, "2026-01-01");
        assert_eq!(jobs[0].posted_detail.as_deref(), Some("2026-01-01"));
    }

    #[test]
    fn markers_and_disabled_next() {
        let ex = ListingExtractor::new(&profile()).unwrap();
        assert_eq!(ex.marker(LISTING, ChangeMarker::FirstTitle).as_deref(), Some("Senior Engineer"));
        assert_eq!(
            ex.marker(LISTING, ChangeMarker::FirstLink).as_deref(),
            Some("https://jobs.acme.test/jobs/1")
        );
        assert!(ex.marker("<html></html>", ChangeMarker::FirstTitle).is_none());

        let next = compile(".next:not([disabled])").unwrap();
        assert!(!has_element(LISTING, &next));
        assert!(has_element(r#"<button class="next">Next</button>"#, &next));
    }

    #[test]
    fn highest_pager_label() {
        let pager = compile(".pagination a, .pagination button").unwrap();
        let html = r#"<nav class="pagination">
            <a>1</a><a> 2 </a><button>7</button><a>Next</a><a>...</a></nav>
            <a>99</a>"#;
        assert_eq!(highest_page_number(html, &pager), Some(7));
        assert_eq!(highest_page_number(LISTING, &pager), None);
    }

    #[test]
    fn link_normalization() {
        let origin = Url::parse("https://careers.wipro.com").unwrap();
        assert_eq!(
            normalize_link(&origin, "/job/123/").as_deref(),
            Some("https://careers.wipro.com/job/123/")
        );
        assert_eq!(
            normalize_link(&origin, " https://x.test/a#b ").as_deref(),
            Some("https://x.test/a")
        );
        assert!(normalize_link(&origin, "").is_none());
        assert!(normalize_link(&origin, "mailto:jobs@x.test").is_none());
    }

    #[test]
    fn detail_extraction() {
        let mut p = profile();
        p.posted = Some(PostedSource::Detail(".posted-on"));
        let ex = DetailExtractor::for_profile(&p).unwrap().unwrap();
        assert!(ex.reads_posted());

        let html = r#"<div class="desc"><p>We build  things.</p>
            <ul><li>Rust</li><li>Tokio</li></ul></div><span class="posted-on">Posted 01/02/2026</span>"#;
        let detail = ex.extract(html).unwrap();
        assert_eq!(detail.description, "We build things.\nRust\nTokio");
        assert_eq!(detail.posted.as_deref(), Some("Posted 01/02/2026"));

        assert!(ex.extract("<div class=\"other\"></div>").is_none());
    }

    #[test]
    fn bad_selector_is_reported() {
        let mut p = profile();
        p.card = "div[";
        assert!(ListingExtractor::new(&p).is_err());

        p.card = ".job";
        p.detail = None;
        assert!(DetailExtractor::for_profile(&p).unwrap().is_none());
    }
}
