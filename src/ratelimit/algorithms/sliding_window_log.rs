//! Sliding-window log limiter.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

use super::RateLimiter;
use crate::error::{Result, WardenError};
use crate::ratelimit::clock::Clock;
use crate::ratelimit::counter::RequestCounters;
use crate::ratelimit::decision::{RateLimitMetrics, RateLimitResult};
use crate::ratelimit::policy::{Algorithm, Policy};
use crate::ratelimit::store::SlidingWindowStore;

#[derive(Debug, Clone, Copy)]
struct Settings {
    limit: u64,
    window_millis: u64,
}

/// Keeps the exact timestamp of every admitted request and admits a new
/// one while fewer than `limit` fall inside the trailing window.
pub struct SlidingWindowLogLimiter {
    store: SlidingWindowStore,
    settings: RwLock<Option<Settings>>,
    counters: RequestCounters,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLogLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: SlidingWindowStore::new(),
            settings: RwLock::new(None),
            counters: RequestCounters::new(),
            clock,
        }
    }

    pub fn store(&self) -> &SlidingWindowStore {
        &self.store
    }
}

impl RateLimiter for SlidingWindowLogLimiter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::SlidingWindowLog
    }

    fn configure(&self, policy: &Policy) {
        *self.settings.write() = Some(Settings {
            limit: policy.limit,
            window_millis: policy.window_millis(),
        });
    }

    fn allow_request(&self, client_id: &str) -> Result<RateLimitResult> {
        let settings = (*self.settings.read()).ok_or(WardenError::NotConfigured)?;

        let (allowed, size) = self.store.with_log(client_id, |log| {
            // Read under the entry guard so appends stay in chronological order
            let now = self.clock.now_millis();
            while log
                .front()
                .is_some_and(|&oldest| now.saturating_sub(oldest) > settings.window_millis)
            {
                log.pop_front();
            }

            let allowed = (log.len() as u64) < settings.limit;
            if allowed {
                log.push_back(now);
            }
            (allowed, log.len() as u64)
        });
        self.counters.record(allowed);

        if allowed {
            trace!(client_id, size, "Request admitted");
        } else {
            debug!(client_id, size, limit = settings.limit, "Sliding window limit exceeded");
        }

        Ok(RateLimitResult::new(
            allowed,
            self.algorithm(),
            settings.limit.saturating_sub(size),
            settings.window_millis,
        )
        .with_metadata("currentWindowSize", size)
        .with_metadata("limit", settings.limit))
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
            gauge: self.store.sample_len().unwrap_or(0) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use std::time::Duration;

    fn limiter(limit: u64, window_secs: u64) -> (SlidingWindowLogLimiter, ManualClock) {
        let clock = ManualClock::new(0);
        let limiter = SlidingWindowLogLimiter::new(Arc::new(clock.clone()));
        limiter.configure(
            &Policy::new("sliding_window_log")
                .with_limit(limit)
                .with_window_secs(window_secs),
        );
        (limiter, clock)
    }

    #[test]
    fn test_limit_within_window() {
        let (limiter, _clock) = limiter(2, 1);

        assert!(limiter.allow_request("client").unwrap().allowed);
        let second = limiter.allow_request("client").unwrap();
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);

        let result = limiter.allow_request("client").unwrap();
        assert!(!result.allowed);
        assert_eq!(result.retry_after_millis, 1000);
        assert_eq!(result.metadata["currentWindowSize"], 2);
    }

    #[test]
    fn test_aged_entries_are_pruned() {
        let (limiter, clock) = limiter(2, 1);
        limiter.allow_request("client").unwrap();
        limiter.allow_request("client").unwrap();

        // An entry exactly one window old still counts
        clock.advance(Duration::from_millis(1000));
        assert!(!limiter.allow_request("client").unwrap().allowed);

        clock.advance(Duration::from_millis(1));
        let result = limiter.allow_request("client").unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
        assert_eq!(limiter.store().timestamps("client"), Some(vec![1001]));
    }

    #[test]
    fn test_window_slides_per_entry() {
        let (limiter, clock) = limiter(2, 1);
        limiter.allow_request("client").unwrap();
        clock.advance(Duration::from_millis(600));
        limiter.allow_request("client").unwrap();

        clock.advance(Duration::from_millis(401));
        assert!(limiter.allow_request("client").unwrap().allowed);
        assert!(!limiter.allow_request("client").unwrap().allowed);
        assert_eq!(limiter.store().timestamps("client"), Some(vec![600, 1001]));
    }

    #[test]
    fn test_refused_requests_are_not_logged() {
        let (limiter, _clock) = limiter(1, 60);
        for _ in 0..5 {
            limiter.allow_request("client").unwrap();
        }
        assert_eq!(limiter.store().timestamps("client"), Some(vec![0]));
    }

    #[test]
    fn test_clients_do_not_share_logs() {
        let (limiter, _clock) = limiter(1, 60);

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let limiter = &limiter;
                    s.spawn(move || {
                        let client = format!("client-{}", i);
                        (0..10)
                            .filter(|_| limiter.allow_request(&client).unwrap().allowed)
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 8);
        assert_eq!(limiter.store().len(), 8);
        assert_eq!(limiter.metrics().gauge, 1.0);
    }

    #[test]
    fn test_concurrent_requests_from_one_client() {
        let (limiter, _clock) = limiter(50, 60);

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = &limiter;
                    s.spawn(move || {
                        (0..25)
                            .filter(|_| limiter.allow_request("shared").unwrap().allowed)
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, 50);
        assert_eq!(limiter.store().timestamps("shared").map(|log| log.len()), Some(50));
        let metrics = limiter.metrics();
        assert_eq!(metrics.allowed_requests, 50);
        assert_eq!(metrics.blocked_requests, 150);
    }
}
