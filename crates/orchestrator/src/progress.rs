//! Progress tracking

use tokio::sync::Mutex;
use tracing::info;

#[derive(Default)]
struct Counts {
    total: usize,
    completed: usize,
    failed: usize,
    postings: usize,
}

/// Per-run site counters, logged once every site has returned.
pub struct ProgressTracker {
    counts: Mutex<Counts>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(Counts::default()),
        }
    }

    pub async fn set_total(&self, total: usize) {
        *self.counts.lock().await = Counts {
            total,
            ..Counts::default()
        };
    }

    pub async fn site_completed(&self, postings: usize) {
        let mut counts = self.counts.lock().await;
        counts.completed += 1;
        counts.postings += postings;
    }

    pub async fn site_failed(&self) {
        self.counts.lock().await.failed += 1;
    }

    pub async fn print_summary(&self) {
        let counts = self.counts.lock().await;

        info!("Crawl Summary:");
        info!("  Sites selected: {}", counts.total);
        info!("  Completed: {}", counts.completed);
        info!("  Failed: {}", counts.failed);
        info!("  Postings returned: {}", counts.postings);
        if counts.total > 0 {
            info!(
                "  Success rate: {:.1}%",
                (counts.completed as f64 / counts.total as f64) * 100.0
            );
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
