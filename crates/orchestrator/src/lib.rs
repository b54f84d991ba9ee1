//! Orchestrator - runs site crawlers concurrently and feeds the job store

mod orchestrator;
mod progress;
mod rate_limiter;

pub use orchestrator::Orchestrator;
pub use progress::ProgressTracker;
pub use rate_limiter::RateLimiter;
