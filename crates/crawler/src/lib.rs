//! Profile-driven crawling
//!
//! A single [`ProfileCrawler`] walks any career site described by a
//! `SiteProfile`: listing pagination (next button or URL template), card
//! extraction, then an optional detail phase over a bounded tab pool.

mod crawler;
pub mod detail;
pub mod extract;

#[cfg(test)]
mod testing;

pub use crawler::{crawlers_for, ProfileCrawler};
pub use detail::DetailPool;
pub use extract::{DetailExtractor, ListingExtractor};
