//! Token bucket limiter.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

use super::RateLimiter;
use crate::error::{Result, WardenError};
use crate::ratelimit::clock::Clock;
use crate::ratelimit::counter::RequestCounters;
use crate::ratelimit::decision::{RateLimitMetrics, RateLimitResult, BUCKET_RETRY_AFTER_MILLIS};
use crate::ratelimit::policy::{Algorithm, Policy};
use crate::ratelimit::store::TokenBucketStore;

#[derive(Debug, Clone, Copy)]
struct Settings {
    capacity: f64,
    refill_rate: f64,
}

/// Each client holds up to `capacity` tokens, refilled continuously at
/// `refill_rate` tokens per second; an admitted request spends one token.
pub struct TokenBucketLimiter {
    store: TokenBucketStore,
    settings: RwLock<Option<Settings>>,
    counters: RequestCounters,
    clock: Arc<dyn Clock>,
}

impl TokenBucketLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: TokenBucketStore::new(),
            settings: RwLock::new(None),
            counters: RequestCounters::new(),
            clock,
        }
    }

    pub fn store(&self) -> &TokenBucketStore {
        &self.store
    }
}

impl RateLimiter for TokenBucketLimiter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::TokenBucket
    }

    fn configure(&self, policy: &Policy) {
        *self.settings.write() = Some(Settings {
            capacity: policy.capacity as f64,
            refill_rate: policy.refill_rate,
        });
    }

    fn allow_request(&self, client_id: &str) -> Result<RateLimitResult> {
        let settings = (*self.settings.read()).ok_or(WardenError::NotConfigured)?;
        let now = self.clock.now_millis();

        let (allowed, tokens) =
            self.store
                .with_bucket(client_id, settings.capacity, now, |bucket| {
                    let elapsed = now.saturating_sub(bucket.last_refill_millis);
                    let refill = elapsed as f64 / 1000.0 * settings.refill_rate;
                    bucket.tokens = (bucket.tokens + refill).min(settings.capacity);
                    // Refill time advances even when the request is refused
                    bucket.last_refill_millis = bucket.last_refill_millis.max(now);

                    let allowed = bucket.tokens >= 1.0;
                    if allowed {
                        bucket.tokens -= 1.0;
                    }
                    (allowed, bucket.tokens)
                });
        self.counters.record(allowed);

        if allowed {
            trace!(client_id, tokens, "Request admitted");
        } else {
            debug!(client_id, tokens, "Token bucket empty");
        }

        Ok(RateLimitResult::new(
            allowed,
            self.algorithm(),
            tokens.floor() as u64,
            BUCKET_RETRY_AFTER_MILLIS,
        )
        .with_metadata("tokens", tokens)
        .with_metadata("capacity", settings.capacity)
        .with_metadata("refillRate", settings.refill_rate))
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
            gauge: self.store.sample_tokens().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use std::time::Duration;

    fn limiter(capacity: u64, refill_rate: f64) -> (TokenBucketLimiter, ManualClock) {
        let clock = ManualClock::new(0);
        let limiter = TokenBucketLimiter::new(Arc::new(clock.clone()));
        limiter.configure(
            &Policy::new("token_bucket")
                .with_capacity(capacity)
                .with_refill_rate(refill_rate),
        );
        (limiter, clock)
    }

    #[test]
    fn test_burst_up_to_capacity() {
        let (limiter, _clock) = limiter(5, 1.0);

        for expected_remaining in (0..5).rev() {
            let result = limiter.allow_request("client").unwrap();
            assert!(result.allowed);
            assert_eq!(result.remaining, expected_remaining);
        }

        let result = limiter.allow_request("client").unwrap();
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert_eq!(result.retry_after_millis, 1000);
        assert_eq!(result.metadata["capacity"], 5.0);
        assert_eq!(result.metadata["refillRate"], 1.0);
    }

    #[test]
    fn test_refill_admits_one_more_after_a_second() {
        let (limiter, clock) = limiter(5, 1.0);
        for _ in 0..6 {
            limiter.allow_request("client").unwrap();
        }

        clock.advance(Duration::from_millis(1000));

        assert!(limiter.allow_request("client").unwrap().allowed);
        assert!(!limiter.allow_request("client").unwrap().allowed);
    }

    #[test]
    fn test_partial_refill_accumulates() {
        let (limiter, clock) = limiter(1, 1.0);
        assert!(limiter.allow_request("client").unwrap().allowed);

        clock.advance(Duration::from_millis(500));
        assert!(!limiter.allow_request("client").unwrap().allowed);

        clock.advance(Duration::from_millis(500));
        assert!(limiter.allow_request("client").unwrap().allowed);
    }

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let (limiter, clock) = limiter(3, 10.0);
        limiter.allow_request("client").unwrap();

        clock.advance(Duration::from_secs(3600));
        limiter.allow_request("client").unwrap();

        let bucket = limiter.store().get("client").unwrap();
        assert_eq!(bucket.tokens, 2.0);
        assert_eq!(bucket.last_refill_millis, 3_600_000);
    }

    #[test]
    fn test_clients_have_separate_buckets() {
        let (limiter, _clock) = limiter(1, 0.0);

        assert!(limiter.allow_request("a").unwrap().allowed);
        assert!(!limiter.allow_request("a").unwrap().allowed);
        assert!(limiter.allow_request("b").unwrap().allowed);
    }

    #[test]
    fn test_concurrent_requests_never_over_admit() {
        let (limiter, _clock) = limiter(50, 1.0);

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..25)
                            .filter(|_| limiter.allow_request("shared").unwrap().allowed)
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 50);
        let metrics = limiter.metrics();
        assert_eq!(metrics.allowed_requests, 50);
        assert_eq!(metrics.blocked_requests, 150);
    }

    #[test]
    fn test_metrics_sample_tokens() {
        let (limiter, _clock) = limiter(4, 1.0);
        assert_eq!(limiter.metrics().gauge, 0.0);

        limiter.allow_request("client").unwrap();

        let metrics = limiter.metrics();
        assert_eq!(metrics.algorithm, Some(Algorithm::TokenBucket));
        assert_eq!(metrics.gauge, 3.0);
        assert_eq!(limiter.metrics(), metrics);
    }
}
