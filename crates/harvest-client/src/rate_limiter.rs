use std::num::NonZeroU32;

use governor::{
    Quota, RateLimiter as GovernorLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

use crate::ClientConfig;

/// Paces request admission against an explorer.
///
/// Wraps a `governor` token bucket: tokens refill at `requests_per_second`
/// and a caller blocks in [`RateLimiter::acquire`] until one is available.
/// It never retries anything; that is the client's job. A ceiling of zero
/// disables pacing.
pub struct RateLimiter {
    limiter: Option<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    requests_per_second: u32,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_second)
            .map(|rps| GovernorLimiter::direct(Quota::per_second(rps)));

        Self {
            limiter,
            requests_per_second,
        }
    }

    /// Limiter with the ceiling selected by API key presence.
    pub fn for_config(config: &ClientConfig) -> Self {
        let requests_per_second = config.effective_requests_per_second();
        tracing::info!(
            requests_per_second,
            api_key = config.has_api_key(),
            "Explorer rate limiter initialized"
        );
        Self::new(requests_per_second)
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    /// Wait until one more request can be sent without exceeding the ceiling.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}
