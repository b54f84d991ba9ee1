//! Registered career sites
//!
//! Selectors mirror what each site rendered when the profiles were written.
//! Sites change markup without notice, so a profile that suddenly yields no
//! cards usually needs its selectors refreshed here and nowhere else.

use careerscan_common::{ChangeMarker, Pagination, PostedSource, SiteProfile};

/// All registered profiles, in the order `all` runs them.
pub static PROFILES: [SiteProfile; 6] = [
    // Amazon
    SiteProfile {
        id: "amazon",
        company: "Amazon",
        origin: "https://www.amazon.jobs",
        start_url: "https://www.amazon.jobs/en/search",
        card: ".job-tile",
        title: ".job-title",
        link: "a.job-link",
        location: ".location-and-id .location",
        posted: None,
        pagination: Pagination::NextButton {
            selector: ".pagination .next:not([disabled])",
            marker: ChangeMarker::FirstTitle,
        },
        detail: Some(".section.description"),
        consent_text: None,
        exclude_title: None,
        max_pages: 20,
        pool_size: 20,
        block_resources: false,
    },
    // Google
    SiteProfile {
        id: "google",
        company: "Google",
        origin: "https://careers.google.com",
        start_url: "https://careers.google.com/jobs/results/",
        card: "section[data-testid=\"job-listing\"] article",
        title: "h2",
        link: "a[href]",
        location: "[data-testid=\"job-location\"]",
        posted: Some(PostedSource::Card("[data-testid=\"job-posted-date\"]")),
        pagination: Pagination::NextButton {
            selector: "button[aria-label=\"Next page\"]:not([disabled]), .next:not([disabled])",
            marker: ChangeMarker::FirstTitle,
        },
        detail: Some("section[data-testid=\"job-details\"]"),
        consent_text: None,
        exclude_title: None,
        max_pages: 100,
        pool_size: 20,
        block_resources: false,
    },
    // Barclays
    SiteProfile {
        id: "barclays",
        company: "Barclays",
        origin: "https://search.jobs.barclays",
        start_url: "https://search.jobs.barclays/search-jobs",
        card: "#search-results-list li",
        title: "strong",
        link: "a[href]",
        location: ".job-location",
        posted: Some(PostedSource::Detail(".job-info-label-text")),
        pagination: Pagination::NextButton {
            selector: ".next:not([disabled])",
            marker: ChangeMarker::FirstTitle,
        },
        detail: Some(".ats-description"),
        consent_text: Some("accept"),
        exclude_title: Some(r"(?i)featured story"),
        max_pages: 40,
        pool_size: 40,
        block_resources: false,
    },
    // Accenture
    SiteProfile {
        id: "accenture",
        company: "Accenture",
        origin: "https://www.accenture.com",
        start_url: "https://www.accenture.com/in-en/careers/jobsearch",
        card: ".rad-filters-vertical__job-card--open, .rad-filters-vertical__job-card",
        title: ".rad-filters-vertical__job-card-title",
        link: "a[href*=\"/in-en/careers/jobdetails\"]",
        location: ".job-location, .location, [data-job-location], span[class*=\"location\"], div[class*=\"location\"]",
        posted: Some(PostedSource::CrawlDate),
        pagination: Pagination::NextButton {
            selector: ".rad-icon-button.rad-icon-button--secondary.rad-pagination__next",
            marker: ChangeMarker::FirstLink,
        },
        detail: Some(".rad-job-detail"),
        consent_text: None,
        exclude_title: None,
        max_pages: 40,
        pool_size: 40,
        block_resources: true,
    },
    // Wipro
    SiteProfile {
        id: "wipro",
        company: "Wipro",
        origin: "https://careers.wipro.com",
        start_url: "https://careers.wipro.com/search/?q=&locationsearch=india&startrow=0",
        card: "tr.data-row",
        title: "a[href^=\"/job/\"]",
        link: "a[href^=\"/job/\"]",
        location: ".colLocation",
        posted: Some(PostedSource::Card(".colPostedDate")),
        pagination: Pagination::Url {
            template: "https://careers.wipro.com/search/?q=&locationsearch=india&startrow={offset}",
            page_size: 25,
            last_page: None,
        },
        detail: None,
        consent_text: None,
        exclude_title: None,
        max_pages: 50,
        pool_size: 3,
        block_resources: true,
    },
    // Capgemini
    SiteProfile {
        id: "capgemini",
        company: "Capgemini",
        origin: "https://www.capgemini.com",
        start_url: "https://www.capgemini.com/in-en/careers/join-capgemini/job-search/?page=1&size=12&country_code=in-en",
        card: ".JobRow-module__job-card___riAUE",
        title: "a, [data-automation-id=\"job-title\"]",
        link: "a[href]",
        location: "[data-automation-id=\"job-location\"], .job-listing__location",
        posted: None,
        pagination: Pagination::Url {
            template: "https://www.capgemini.com/in-en/careers/join-capgemini/job-search/?page={page}&size=12&country_code=in-en",
            page_size: 12,
            last_page: Some(".pagination a, .pagination button"),
        },
        detail: None,
        consent_text: None,
        exclude_title: None,
        max_pages: 50,
        pool_size: 3,
        block_resources: true,
    },
];

/// Look a profile up by id (case-insensitive).
pub fn profile(id: &str) -> Option<&'static SiteProfile> {
    let id = id.trim();
    PROFILES.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// All registered ids, in registration order.
pub fn site_ids() -> Vec<&'static str> {
    PROFILES.iter().map(|p| p.id).collect()
}
