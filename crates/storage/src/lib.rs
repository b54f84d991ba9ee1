//! Storage backends for scraped postings
//!
//! Every backend upserts on the posting link.

mod memory;
mod sqlite;
mod supabase;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use supabase::{SupabaseConfig, SupabaseStore};

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use careerscan_common::{CareerScanError, JobStore};

/// Default SQLite file when neither a flag nor `CAREERSCAN_SQLITE_PATH` names one.
pub const DEFAULT_SQLITE_PATH: &str = "careerscan.db";

/// Which backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Supabase when credentials are present, otherwise none.
    Auto,
    Supabase,
    Sqlite,
    Memory,
    None,
}

/// SQLite path precedence: explicit, then `CAREERSCAN_SQLITE_PATH`, then the default.
pub fn sqlite_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("CAREERSCAN_SQLITE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH))
}

/// Open the requested store. `Ok(None)` means crawl without persisting.
pub async fn open(kind: StoreKind, sqlite: Option<&Path>) -> Result<Option<Arc<dyn JobStore>>> {
    let store: Option<Arc<dyn JobStore>> = match kind {
        StoreKind::Auto => match SupabaseConfig::from_env() {
            Some(config) => Some(Arc::new(SupabaseStore::new(config)?)),
            None => {
                info!("Supabase credentials not set; results will not be persisted");
                None
            }
        },
        StoreKind::Supabase => {
            let config = SupabaseConfig::from_env().ok_or_else(|| {
                CareerScanError::Config(
                    "SUPABASE_URL and SUPABASE_SERVICE_KEY must be set".to_string(),
                )
            })?;
            Some(Arc::new(SupabaseStore::new(config)?))
        }
        StoreKind::Sqlite => {
            let path = sqlite_path(sqlite);
            Some(Arc::new(SqliteStore::open(&path).await?))
        }
        StoreKind::Memory => Some(Arc::new(MemoryStore::new())),
        StoreKind::None => None,
    };

    if let Some(store) = &store {
        info!("Using {} job store", store.name());
    }
    Ok(store)
}
