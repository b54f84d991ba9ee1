// runner.rs
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use careerscan_browser::ChromeLauncher;
use careerscan_common::{BrowserLauncher, CareerScanError, CrawlConfig};
use careerscan_crawler::crawlers_for;
use careerscan_orchestrator::Orchestrator;
use careerscan_sites::{site_ids, SiteSelection, PROFILES};
use careerscan_storage::StoreKind;

use crate::output::{print_jobs, print_report, print_sites};

/// Everything `careerscan crawl` was asked to do.
pub struct CrawlOptions {
    pub sites: String,
    pub max_pages: Option<usize>,
    pub pool_size: Option<usize>,
    pub headful: bool,
    pub block_resources: bool,
    pub chrome_path: Option<PathBuf>,
    pub preset: String,
    pub store: String,
    pub sqlite_path: Option<PathBuf>,
    pub output_format: String,
}

pub async fn run_crawl(opts: CrawlOptions) -> Result<()> {
    let config = build_config(&opts)?;
    info!("Starting crawl...");
    info!("Sites: {}", opts.sites);
    info!("Preset: {}", opts.preset);
    info!("Max pages per site: {}", config.max_pages);
    match config.pool_size {
        Some(n) => info!("Detail pool size: {}", n),
        None => info!("Detail pool size: per site"),
    }

    let selected = careerscan_sites::resolve(&opts.sites)?;
    for id in SiteSelection::unknown(&selected, &site_ids()) {
        warn!("Unknown site '{}'. Known sites: {}", id, site_ids().join(", "));
    }

    let store = careerscan_storage::open(parse_store(&opts.store)?, opts.sqlite_path.as_deref())
        .await
        .context("Failed to open job store")?;

    let mut launcher = ChromeLauncher::new();
    if let Some(path) = &opts.chrome_path {
        launcher = launcher.with_executable(path);
    }
    let launcher: Arc<dyn BrowserLauncher> = Arc::new(launcher);

    let mut orchestrator = Orchestrator::new(config);
    if let Some(store) = store {
        orchestrator = orchestrator.with_store(store);
    }
    for crawler in crawlers_for(&PROFILES, launcher)? {
        orchestrator.add_crawler(crawler);
    }

    let crawl_start = Instant::now();
    let report = orchestrator.run(&opts.sites).await?;
    let crawl_duration = crawl_start.elapsed();

    print_report(&report, &opts.output_format, crawl_duration)?;
    Ok(())
}

/// Start from the preset, then apply explicit flags.
fn build_config(opts: &CrawlOptions) -> Result<CrawlConfig> {
    let mut config = CrawlConfig::preset(&opts.preset)
        .ok_or_else(|| CareerScanError::Config(format!("Unknown preset '{}'", opts.preset)))?;

    if let Some(pages) = opts.max_pages {
        if pages == 0 {
            return Err(anyhow!("--max-pages must be at least 1"));
        }
        config = config.with_max_pages(pages);
    }
    if let Some(size) = opts.pool_size {
        if size == 0 {
            return Err(anyhow!("--pool-size must be at least 1"));
        }
        config = config.with_pool_size(size);
    }
    config.block_resources = opts.block_resources;
    Ok(config.with_headless(!opts.headful))
}

fn parse_store(name: &str) -> Result<StoreKind> {
    match name.trim().to_lowercase().as_str() {
        "auto" => Ok(StoreKind::Auto),
        "supabase" => Ok(StoreKind::Supabase),
        "sqlite" => Ok(StoreKind::Sqlite),
        "memory" => Ok(StoreKind::Memory),
        "none" => Ok(StoreKind::None),
        other => Err(anyhow!("Invalid store '{}'", other)),
    }
}

pub fn list_sites(format: &str) -> Result<()> {
    print_sites(&PROFILES, format)
}

pub async fn run_export(store: &str, sqlite_path: Option<&Path>, format: &str) -> Result<()> {
    let store = careerscan_storage::open(parse_store(store)?, sqlite_path)
        .await?
        .ok_or_else(|| {
            CareerScanError::Config(
                "No job store configured; set SUPABASE_URL and SUPABASE_SERVICE_KEY or pass --store sqlite"
                    .to_string(),
            )
        })?;

    match format {
        "csv" => print!("{}", store.export_csv().await?),
        _ => print_jobs(&store.all_jobs().await?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> CrawlOptions {
        CrawlOptions {
            sites: "all".into(),
            max_pages: None,
            pool_size: None,
            headful: false,
            block_resources: true,
            chrome_path: None,
            preset: "balanced".into(),
            store: "none".into(),
            sqlite_path: None,
            output_format: "text".into(),
        }
    }

    #[test]
    fn test_build_config_preset() {
        let config = build_config(&CrawlOptions {
            preset: "fast".into(),
            ..opts()
        })
        .unwrap();
        assert_eq!(config.max_pages, 3);
        assert!(config.headless);
    }

    #[test]
    fn test_build_config_overrides() {
        let config = build_config(&CrawlOptions {
            max_pages: Some(2),
            pool_size: Some(7),
            headful: true,
            block_resources: false,
            ..opts()
        })
        .unwrap();
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.pool_size, Some(7));
        assert!(!config.headless);
        assert!(!config.block_resources);
    }

    #[test]
    fn test_build_config_invalid() {
        assert!(build_config(&CrawlOptions {
            max_pages: Some(0),
            ..opts()
        })
        .is_err());
        assert!(build_config(&CrawlOptions {
            pool_size: Some(0),
            ..opts()
        })
        .is_err());
        assert!(build_config(&CrawlOptions {
            preset: "stealth".into(),
            ..opts()
        })
        .is_err());
    }

    #[test]
    fn test_parse_store() {
        assert_eq!(parse_store("auto").unwrap(), StoreKind::Auto);
        assert_eq!(parse_store(" SQLite ").unwrap(), StoreKind::Sqlite);
        assert_eq!(parse_store("none").unwrap(), StoreKind::None);
        assert!(parse_store("postgres").is_err());
    }

    #[test]
    fn test_every_profile_builds_a_crawler() {
        let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromeLauncher::new());
        let crawlers = crawlers_for(&PROFILES, launcher).unwrap();
        let ids: Vec<&str> = crawlers.iter().map(|c| c.id()).collect();
        assert_eq!(ids, site_ids());
    }

    #[tokio::test]
    async fn test_export_without_store_fails() {
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("NEXT_PUBLIC_SUPABASE_URL");
        let err = run_export("auto", None, "json").await.unwrap_err();
        assert!(err.to_string().contains("No job store configured"));
    }
}
