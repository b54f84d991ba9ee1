//! SQLite-backed job store

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use careerscan_common::{CareerScanError, JobPosting, JobStore};

type JobRow = (String, String, String, String, Option<String>, Option<String>);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", path.display()))?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database; lives as long as the store.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                link          TEXT PRIMARY KEY,
                title         TEXT NOT NULL,
                company       TEXT NOT NULL,
                location      TEXT NOT NULL,
                description   TEXT,
                posted_detail TEXT,
                updated_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| CareerScanError::Store(format!("create jobs table: {e}")))?;
        debug!("SQLite jobs table ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, job: &JobPosting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (link, title, company, location, description, posted_detail, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(link) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                location = excluded.location,
                description = COALESCE(excluded.description, jobs.description),
                posted_detail = COALESCE(excluded.posted_detail, jobs.posted_detail),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job.link.as_str())
        .bind(job.title.as_str())
        .bind(job.company.as_str())
        .bind(job.location.as_str())
        .bind(job.description.as_deref())
        .bind(job.posted_detail.as_deref())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CareerScanError::Store(format!("upsert {}: {e}", job.link)))?;
        Ok(())
    }

    async fn existing_links(&self) -> Result<HashSet<String>> {
        let links: Vec<(String,)> = sqlx::query_as("SELECT link FROM jobs")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CareerScanError::Store(format!("select links: {e}")))?;
        Ok(links.into_iter().map(|(link,)| link).collect())
    }

    async fn all_jobs(&self) -> Result<Vec<JobPosting>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT title, company, location, link, description, posted_detail
            FROM jobs
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CareerScanError::Store(format!("select jobs: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(title, company, location, link, description, posted_detail)| JobPosting {
                title,
                company,
                location,
                link,
                description,
                posted_detail,
            })
            .collect())
    }
}
