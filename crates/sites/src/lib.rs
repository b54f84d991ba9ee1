//! Site registry - the data-driven profile table and site selection
//!
//! This crate provides:
//! - the static `SiteProfile` table for every supported career site
//! - lookup by id
//! - expansion of `all` / comma-separated selectors

mod profiles;
mod selection;

pub use profiles::{profile, site_ids, PROFILES};
pub use selection::SiteSelection;

/// Resolve a selector against the registered profiles.
pub fn resolve(selector: &str) -> anyhow::Result<Vec<String>> {
    SiteSelection::resolve(selector, &site_ids())
}
