//! Leaky bucket limiter.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

use super::RateLimiter;
use crate::error::{Result, WardenError};
use crate::ratelimit::clock::Clock;
use crate::ratelimit::counter::RequestCounters;
use crate::ratelimit::decision::{RateLimitMetrics, RateLimitResult, BUCKET_RETRY_AFTER_MILLIS};
use crate::ratelimit::policy::{Algorithm, Policy};
use crate::ratelimit::store::LeakyBucketStore;

#[derive(Debug, Clone, Copy)]
struct Settings {
    capacity: u64,
    leak_rate: f64,
}

/// Each admitted request adds one unit to the client's bucket, which drains
/// at `refill_rate` whole units per second. Requests are refused while the
/// bucket is full.
pub struct LeakyBucketLimiter {
    store: LeakyBucketStore,
    settings: RwLock<Option<Settings>>,
    counters: RequestCounters,
    clock: Arc<dyn Clock>,
}

impl LeakyBucketLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: LeakyBucketStore::new(),
            settings: RwLock::new(None),
            counters: RequestCounters::new(),
            clock,
        }
    }

    pub fn store(&self) -> &LeakyBucketStore {
        &self.store
    }
}

impl RateLimiter for LeakyBucketLimiter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::LeakyBucket
    }

    fn configure(&self, policy: &Policy) {
        *self.settings.write() = Some(Settings {
            capacity: policy.capacity,
            leak_rate: policy.refill_rate,
        });
    }

    fn allow_request(&self, client_id: &str) -> Result<RateLimitResult> {
        let settings = (*self.settings.read()).ok_or(WardenError::NotConfigured)?;
        let now = self.clock.now_millis();

        let (allowed, size) = self.store.with_bucket(client_id, now, |bucket| {
            let elapsed = now.saturating_sub(bucket.last_leak_millis);
            let leaked = (elapsed as f64 / 1000.0 * settings.leak_rate).floor() as u64;
            // Only whole units drain; the remainder keeps accruing from the old timestamp
            if leaked > 0 {
                bucket.current_size = bucket.current_size.saturating_sub(leaked);
                bucket.last_leak_millis = now;
            }

            let allowed = bucket.current_size < settings.capacity;
            if allowed {
                bucket.current_size += 1;
            }
            (allowed, bucket.current_size)
        });
        self.counters.record(allowed);

        if allowed {
            trace!(client_id, size, "Request admitted");
        } else {
            debug!(client_id, size, capacity = settings.capacity, "Leaky bucket full");
        }

        Ok(RateLimitResult::new(
            allowed,
            self.algorithm(),
            settings.capacity.saturating_sub(size),
            BUCKET_RETRY_AFTER_MILLIS,
        )
        .with_metadata("currentSize", size)
        .with_metadata("capacity", settings.capacity)
        .with_metadata("leakRate", settings.leak_rate))
    }

    fn reset(&self) {
        self.store.reset();
        self.counters.reset();
    }

    fn metrics(&self) -> RateLimitMetrics {
        RateLimitMetrics {
            algorithm: Some(self.algorithm()),
            allowed_requests: self.counters.allowed(),
            blocked_requests: self.counters.blocked(),
            gauge: self.store.sample_size().unwrap_or(0) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use std::time::Duration;

    fn limiter(capacity: u64, leak_rate: f64) -> (LeakyBucketLimiter, ManualClock) {
        let clock = ManualClock::new(0);
        let limiter = LeakyBucketLimiter::new(Arc::new(clock.clone()));
        limiter.configure(
            &Policy::new("leaky_bucket")
                .with_capacity(capacity)
                .with_refill_rate(leak_rate),
        );
        (limiter, clock)
    }

    #[test]
    fn test_fills_to_capacity() {
        let (limiter, _clock) = limiter(2, 1.0);

        let first = limiter.allow_request("client").unwrap();
        assert!(first.allowed);
        assert_eq!(first.remaining, 1);
        assert!(limiter.allow_request("client").unwrap().allowed);

        let result = limiter.allow_request("client").unwrap();
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after_millis, 1000);
        assert_eq!(result.metadata["currentSize"], 2);
        assert_eq!(result.metadata["leakRate"], 1.0);
    }

    #[test]
    fn test_leak_frees_one_slot_per_second() {
        let (limiter, clock) = limiter(2, 1.0);
        for _ in 0..3 {
            limiter.allow_request("client").unwrap();
        }

        clock.advance(Duration::from_millis(1000));

        let result = limiter.allow_request("client").unwrap();
        assert!(result.allowed);
        assert_eq!(result.metadata["currentSize"], 2);
        assert!(!limiter.allow_request("client").unwrap().allowed);
    }

    #[test]
    fn test_partial_leak_keeps_timestamp() {
        let (limiter, clock) = limiter(1, 1.0);
        assert!(limiter.allow_request("client").unwrap().allowed);

        clock.advance(Duration::from_millis(600));
        assert!(!limiter.allow_request("client").unwrap().allowed);
        assert_eq!(limiter.store().get("client").unwrap().last_leak_millis, 0);

        clock.advance(Duration::from_millis(400));
        assert!(limiter.allow_request("client").unwrap().allowed);
        assert_eq!(limiter.store().get("client").unwrap().last_leak_millis, 1000);
    }

    #[test]
    fn test_size_never_drops_below_zero() {
        let (limiter, clock) = limiter(3, 5.0);
        limiter.allow_request("client").unwrap();

        clock.advance(Duration::from_secs(60));
        let result = limiter.allow_request("client").unwrap();

        assert!(result.allowed);
        assert_eq!(result.metadata["currentSize"], 1);
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn test_concurrent_requests_never_overfill() {
        let (limiter, _clock) = limiter(10, 1.0);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10 {
                        limiter.allow_request("shared").unwrap();
                    }
                });
            }
        });

        assert_eq!(limiter.store().get("shared").unwrap().current_size, 10);
        let metrics = limiter.metrics();
        assert_eq!(metrics.allowed_requests, 10);
        assert_eq!(metrics.blocked_requests, 30);
        assert_eq!(metrics.gauge, 10.0);
    }
}
