//! Outbound request rate limiting

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::trace;

/// Requests-per-minute ceiling shared by every target of a session
///
/// Throttles without serializing: a full burst of `requests_per_minute`
/// permits is available up front, then permits refill evenly.
#[derive(Clone)]
pub struct RequestRateLimiter {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    requests_per_minute: u32,
}

impl RequestRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(1u32));
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(rpm))),
            requests_per_minute: rpm.get(),
        }
    }

    /// Wait until a request is allowed
    pub async fn wait(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        trace!(
            "Rate limit of {} requests/minute reached, waiting",
            self.requests_per_minute
        );
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let limiter = RequestRateLimiter::new(100);
        let start = std::time::Instant::now();
        for _ in 0..10 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_ceiling_enforced() {
        let limiter = RequestRateLimiter::new(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_zero_falls_back_to_one() {
        let limiter = RequestRateLimiter::new(0);
        assert_eq!(limiter.requests_per_minute(), 1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_clones_share_budget() {
        let limiter = RequestRateLimiter::new(1);
        let other = limiter.clone();
        assert!(limiter.try_acquire());
        assert!(!other.try_acquire());
    }
}
