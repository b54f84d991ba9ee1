//! Error types for careerscan
//!
//! Typed failures raised by browser drivers, crawlers and stores

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CareerScanError {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Navigation error: {0}")]
    Navigation(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("No crawler for: {0}")]
    UnknownSite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl CareerScanError {
    /// Failed navigations and timeouts are worth another attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, CareerScanError::Timeout(_) | CareerScanError::Navigation(_))
    }

    /// Whether `err` wraps a transient `CareerScanError`.
    #[must_use]
    pub fn is_transient_error(err: &anyhow::Error) -> bool {
        err.downcast_ref::<CareerScanError>()
            .is_some_and(CareerScanError::is_transient)
    }
}

/// Result type alias for careerscan operations
pub type CareerScanResult<T> = Result<T, CareerScanError>;
