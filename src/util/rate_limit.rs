//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Guards the relay against connection floods. Relayed messages are never
/// rate limited: dropping one would desynchronize the two peers.
#[derive(Clone)]
pub struct JoinRateLimiter {
    limiter: Arc<Limiter>,
}

impl JoinRateLimiter {
    pub fn new(joins_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(joins_per_second),
        }
    }

    /// Check if a new connection is allowed (returns true if allowed)
    pub fn check_join(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = JoinRateLimiter::new(2);
        assert!(limiter.check_join());
        assert!(limiter.check_join());
        assert!(!limiter.check_join());
    }

    #[test]
    fn test_zero_rate_still_admits_one() {
        let limiter = JoinRateLimiter::new(0);
        assert!(limiter.check_join());
        assert!(!limiter.check_join());
    }
}
