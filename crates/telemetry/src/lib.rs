//! Telemetry - log subscriber setup and crawl counters
//!
//! Counters go through the `metrics` facade and are no-ops until a recorder
//! is installed by the embedding process.

use anyhow::Result;
use metrics::counter;
use tracing_subscriber::{fmt, EnvFilter};

pub const PAGES_VISITED: &str = "careerscan_pages_visited_total";
pub const POSTINGS_FOUND: &str = "careerscan_postings_found_total";
pub const DETAIL_FAILURES: &str = "careerscan_detail_failures_total";
pub const UPSERTS: &str = "careerscan_upserts_total";
pub const UPSERT_FAILURES: &str = "careerscan_upsert_failures_total";

/// Map a `-v` count to a default filter directive.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: u8, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    let installed = if json {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).compact().try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

pub fn page_visited(site: &str) {
    counter!(PAGES_VISITED, "site" => site.to_string()).increment(1);
}

pub fn postings_found(site: &str, added: usize) {
    counter!(POSTINGS_FOUND, "site" => site.to_string()).increment(added as u64);
}

pub fn detail_failed(site: &str) {
    counter!(DETAIL_FAILURES, "site" => site.to_string()).increment(1);
}

pub fn upserted(site: &str) {
    counter!(UPSERTS, "site" => site.to_string()).increment(1);
}

pub fn upsert_failed(site: &str) {
    counter!(UPSERT_FAILURES, "site" => site.to_string()).increment(1);
}
