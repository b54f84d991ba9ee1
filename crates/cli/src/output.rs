//! Output formatting for crawl reports

use anyhow::Result;
use serde_json::json;
use std::time::Duration;

use careerscan_common::{jobs_to_csv, CrawlReport, JobPosting, SiteProfile};

/// Print a crawl report in the specified format
pub fn print_report(report: &CrawlReport, format: &str, crawl_duration: Duration) -> Result<()> {
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" => print_json(report, crawl_duration)?,
        "csv" | "c" => print!("{}", jobs_to_csv(&report.jobs)),
        "table" | "text" | "t" | "" => print_table(report, crawl_duration),
        _ => {
            eprintln!("Warning: Unknown format '{}', using default table format", format);
            print_table(report, crawl_duration);
        }
    }
    Ok(())
}

fn print_table(report: &CrawlReport, crawl_duration: Duration) {
    if report.jobs.is_empty() {
        println!("\nNo postings to display.\n");
    } else {
        println!("\n{:-<100}", "");
        println!("{:<40} {:<14} {:<24} {:<20}", "TITLE", "COMPANY", "LOCATION", "POSTED");
        println!("{:-<100}", "");
        for job in &report.jobs {
            println!(
                "{:<40} {:<14} {:<24} {:<20}",
                truncate(&job.title, 38),
                truncate(&job.company, 12),
                truncate(&job.location, 22),
                truncate(job.posted_detail.as_deref().unwrap_or("-"), 20)
            );
        }
        println!("{:-<100}", "");
    }

    println!("\nSummary:");
    for (site, count) in &report.per_site {
        let upserted = report.summaries.get(site).map(|s| s.upserted).unwrap_or(0);
        let pages = report.summaries.get(site).map(|s| s.pages).unwrap_or(0);
        println!("  {:<12} {} postings, {} pages, {} upserted", site, count, pages, upserted);
    }
    println!("  Unique postings: {}", report.total);
    println!("  Upserted: {}", report.upserted);
    if !report.errors.is_empty() {
        println!("  Errors:");
        for (key, message) in &report.errors {
            println!("    {}: {}", key, message);
        }
    }
    println!("  Crawl duration: {}", format_duration(crawl_duration));
    println!();
}

fn print_json(report: &CrawlReport, crawl_duration: Duration) -> Result<()> {
    let output = json!({
        "crawl_info": {
            "run_id": report.run_id,
            "started_at": report.started_at,
            "duration_seconds": crawl_duration.as_secs_f64(),
            "duration_formatted": format_duration(crawl_duration),
        },
        "jobs": report.jobs,
        "perCompany": report.per_site,
        "upserted": report.upserted,
        "errors": report.errors,
        "total": report.total,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Stored postings as a JSON array
pub fn print_jobs(jobs: &[JobPosting]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(jobs)?);
    Ok(())
}

/// Print the site registry
pub fn print_sites(profiles: &[SiteProfile], format: &str) -> Result<()> {
    if format.trim().eq_ignore_ascii_case("json") {
        println!("{}", serde_json::to_string_pretty(profiles)?);
        return Ok(());
    }

    println!("{:<12} {:<12} {:<10} {:<8} {}", "SITE", "COMPANY", "PAGING", "DETAIL", "START URL");
    for p in profiles {
        println!(
            "{:<12} {:<12} {:<10} {:<8} {}",
            p.id,
            p.company,
            paging_label(p),
            if p.has_detail_phase() { "yes" } else { "no" },
            p.start_url
        );
    }
    Ok(())
}

fn paging_label(profile: &SiteProfile) -> &'static str {
    match profile.pagination {
        careerscan_common::Pagination::NextButton { .. } => "next",
        careerscan_common::Pagination::Url { .. } => "url",
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let cut: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        value.to_string()
    }
}

/// Format duration in a human-readable way
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        format!("{}ms", millis)
    } else if total_secs < 60 {
        if millis > 0 {
            format!("{}.{:03}s", total_secs, millis)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    }
}
