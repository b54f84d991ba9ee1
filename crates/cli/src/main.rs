mod args;
mod output;
mod runner;

use anyhow::Result;
use clap::Parser;

use args::{Cli, Commands};
use runner::{list_sites, run_crawl, run_export, CrawlOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    careerscan_telemetry::init_logging(cli.verbose, cli.json_logs)?;

    match cli.command {
        Commands::Crawl {
            sites,
            max_pages,
            pool_size,
            headful,
            no_block_resources,
            chrome_path,
            preset,
            store,
            sqlite_path,
            output_format,
        } => {
            run_crawl(CrawlOptions {
                sites,
                max_pages,
                pool_size,
                headful,
                block_resources: !no_block_resources,
                chrome_path,
                preset,
                store,
                sqlite_path,
                output_format,
            })
            .await?;
        }
        Commands::Sites { output_format } => list_sites(&output_format)?,
        Commands::Export {
            store,
            sqlite_path,
            output_format,
        } => run_export(&store, sqlite_path.as_deref(), &output_format).await?,
    }

    Ok(())
}
