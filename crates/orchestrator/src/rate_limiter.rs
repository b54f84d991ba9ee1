//! Store write pacing

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;

/// Token bucket over `governor`; zero writes per second disables pacing.
pub struct RateLimiter {
    inner: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(writes_per_second: u32) -> Self {
        let inner = NonZeroU32::new(writes_per_second)
            .map(|rate| governor::RateLimiter::direct(Quota::per_second(rate)));
        Self { inner }
    }

    pub async fn acquire(&self) {
        if let Some(limiter) = &self.inner {
            limiter.until_ready().await;
        }
    }
}
