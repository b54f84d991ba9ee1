//! In-process store, used for dry runs and tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use careerscan_common::{JobPosting, JobStore};

/// Rows kept in insertion order; an upsert replaces the row in place.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<JobPosting>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, job: &JobPosting) -> Result<()> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.link == job.link) {
            Some(row) => *row = job.clone(),
            None => rows.push(job.clone()),
        }
        Ok(())
    }

    async fn existing_links(&self) -> Result<HashSet<String>> {
        Ok(self.rows.read().await.iter().map(|r| r.link.clone()).collect())
    }

    async fn all_jobs(&self) -> Result<Vec<JobPosting>> {
        Ok(self.rows.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_by_link_keeps_one_row() {
        let store = MemoryStore::new();
        let job = JobPosting::new("SDE", "Amazon", "Seattle", "https://amazon.jobs/1");
        store.upsert(&job).await.unwrap();
        store.upsert(&job.clone().with_description("Ship it")).await.unwrap();

        assert_eq!(store.len().await, 1);
        let rows = store.all_jobs().await.unwrap();
        assert_eq!(rows[0].description.as_deref(), Some("Ship it"));
        assert!(store.existing_links().await.unwrap().contains("https://amazon.jobs/1"));
    }
}
