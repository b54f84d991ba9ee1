//! Supabase (PostgREST) job store

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use careerscan_common::{CareerScanError, JobPosting, JobStore};

const PAGE_SIZE: usize = 1000;
const JOB_COLUMNS: &str = "title,company,location,link,description,posted_detail";

/// Connection settings for a Supabase project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
    pub table: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            table: "jobs".to_string(),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Read `SUPABASE_URL` (or `NEXT_PUBLIC_SUPABASE_URL`), `SUPABASE_SERVICE_KEY`
    /// and optionally `SUPABASE_JOBS_TABLE`. `None` if either credential is missing.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let url = present("SUPABASE_URL").or_else(|| present("NEXT_PUBLIC_SUPABASE_URL"))?;
        let key = present("SUPABASE_SERVICE_KEY")?;
        let config = Self::new(url.trim(), key.trim());
        Some(match present("SUPABASE_JOBS_TABLE") {
            Some(table) => config.with_table(table.trim()),
            None => config,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    link: String,
}

pub struct SupabaseStore {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
    }

    fn upsert_request(&self, job: &JobPosting) -> RequestBuilder {
        self.authed(self.client.post(self.config.table_url()))
            .query(&[("on_conflict", "link")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[job])
    }

    fn select_request(&self, columns: &str, offset: usize) -> RequestBuilder {
        self.authed(self.client.get(self.config.table_url())).query(&[
            ("select", columns.to_string()),
            ("order", "link.asc".to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ])
    }

    /// Read every row of `columns`, one page at a time.
    async fn select_all<T: for<'de> Deserialize<'de>>(&self, columns: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        loop {
            let response = self
                .select_request(columns, rows.len())
                .send()
                .await
                .context("Failed to query Supabase")?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(CareerScanError::Store(format!("Supabase select {status}: {body}")).into());
            }

            let page: Vec<T> = response
                .json()
                .await
                .context("Failed to parse Supabase rows")?;
            let fetched = page.len();
            rows.extend(page);
            if fetched < PAGE_SIZE {
                break;
            }
        }
        debug!("Fetched {} rows from {}", rows.len(), self.config.table);
        Ok(rows)
    }
}

#[async_trait]
impl JobStore for SupabaseStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn upsert(&self, job: &JobPosting) -> Result<()> {
        let response = self
            .upsert_request(job)
            .send()
            .await
            .context("Failed to send Supabase upsert")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CareerScanError::Store(format!("Supabase upsert {status}: {body}")).into());
        }
        Ok(())
    }

    async fn existing_links(&self) -> Result<HashSet<String>> {
        let rows: Vec<LinkRow> = self.select_all("link").await?;
        Ok(rows.into_iter().map(|r| r.link).collect())
    }

    async fn all_jobs(&self) -> Result<Vec<JobPosting>> {
        self.select_all(JOB_COLUMNS).await
    }
}
