use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared request budget for one upstream host.
///
/// A backward scan issues one call per candidate date for every symbol; the
/// pacer spreads those calls out instead of bursting them at the CDN.
#[derive(Clone, Default)]
pub struct RequestPacer {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("limited", &self.limiter.is_some())
            .finish()
    }
}

impl RequestPacer {
    /// Allow `per_second` calls per second with an equal burst. Zero disables pacing.
    pub fn per_second(per_second: u32) -> Self {
        match NonZeroU32::new(per_second) {
            Some(rate) => Self {
                limiter: Some(Arc::new(RateLimiter::direct(Quota::per_second(rate)))),
            },
            None => Self::unlimited(),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the budget admits one more call.
    pub async fn ready(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_means_unlimited() {
        assert!(!RequestPacer::per_second(0).is_limited());
        assert!(RequestPacer::per_second(5).is_limited());
    }

    #[tokio::test]
    async fn burst_within_quota_does_not_wait() {
        let pacer = RequestPacer::per_second(3);
        let started = std::time::Instant::now();
        for _ in 0..3 {
            pacer.ready().await;
        }
        assert!(started.elapsed() < std::time::Duration::from_millis(200));
    }
}
