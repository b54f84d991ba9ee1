use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "careerscan")]
#[command(version = "0.1.0")]
#[command(about = "Crawls company career sites and stores job postings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl career sites and persist new postings
    Crawl {
        /// Sites to crawl: "all" or a comma-separated list, e.g. google,wipro
        #[arg(default_value = "all")]
        sites: String,

        /// Max listing pages per site (profiles may cap lower)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Detail tabs per site
        #[arg(long)]
        pool_size: Option<usize>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Load images, stylesheets and fonts instead of blocking them
        #[arg(long)]
        no_block_resources: bool,

        /// Chrome/Chromium executable (auto-detected when omitted)
        #[arg(long)]
        chrome_path: Option<PathBuf>,

        /// Preset: fast, balanced, thorough, gentle
        #[arg(long, default_value = "balanced", value_parser = ["fast", "balanced", "thorough", "gentle"])]
        preset: String,

        /// Job store: auto, supabase, sqlite, memory, none
        #[arg(long, default_value = "auto", value_parser = ["auto", "supabase", "sqlite", "memory", "none"])]
        store: String,

        /// SQLite database file for --store sqlite
        #[arg(long)]
        sqlite_path: Option<PathBuf>,

        /// Output format: text, json, csv
        #[arg(short, long, default_value = "text")]
        output_format: String,
    },

    /// List the supported sites
    Sites {
        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        output_format: String,
    },

    /// Print every posting held by a store
    Export {
        /// Job store: auto, supabase, sqlite
        #[arg(long, default_value = "auto", value_parser = ["auto", "supabase", "sqlite"])]
        store: String,

        #[arg(long)]
        sqlite_path: Option<PathBuf>,

        /// Output format: json, csv
        #[arg(short, long, default_value = "json", value_parser = ["json", "csv"])]
        output_format: String,
    },
}
