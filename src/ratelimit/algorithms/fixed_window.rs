//! Fixed window limiter.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

use super::RateLimiter;
use crate::error::{Result, WardenError};
use crate::ratelimit::clock::Clock;
use crate::ratelimit::counter::RequestCounters;
use crate::ratelimit::decision::{RateLimitMetrics, RateLimitResult};
use crate::ratelimit::policy::{Algorithm, Policy};
use crate::ratelimit::store::FixedWindowStore;

#[derive(Debug, Clone, Copy)]
struct Settings {
    limit: u64,
    window_millis: u64,
}

/// Admits up to `limit` requests per client in each window.
///
/// All clients share one window: when it expires every client's count
/// restarts at once. A refused request is told to wait a full window.
pub struct FixedWindowLimiter {
    store: FixedWindowStore,
    settings: RwLock<Option<Settings>>,
    counters: RequestCounters,
    clock: Arc<dyn Clock>,
}

impl FixedWindowLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: FixedWindowStore::new(clock.now_millis()),
            settings: RwLock::new(None),
            counters: RequestCounters::new(),
            clock,
        }
    }

    /// The underlying per-client counters.
    pub fn store(&self) -> &FixedWindowStore {
        &self.store
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::FixedWindow
    }

    fn configure(&self, policy: &Policy) {
        *self.settings.write() = Some(Settings {
            limit: policy.limit,
            window_millis: policy.window_millis(),
        });
    }

    fn allow_request(&self, client_id: &str) -> Result<RateLimitResult> {
        let settings = (*self.settings.read()).ok_or(WardenError::NotConfigured)?;
        let now = self.clock.now_millis();

        let (count, window_start) = self
            .store
            .increment(client_id, now, settings.window_millis);
        let allowed = count <= settings.limit;
        self.counters.record(allowed);

        if allowed {
            trace!(client_id, count, limit = settings.limit, "Request admitted");
        } else {
            debug!(client_id, count, limit = settings.limit, "Fixed window limit exceeded");
        }

        Ok(RateLimitResult::new(
            allowed,
            self.algorithm(),
            settings.limit.saturating_sub(count),
            settings.window_millis,
        )
        .with_metadata("currentCount", count)
        .with_metadata("limit", settings.limit)
        .with_metadata("windowStart", window_start))
    }

    fn reset(&self) {
        self.store.reset(self.clock.now_millis());
        self.counters.reset();
    }

    fn metrics(&self) -> RateLimitMetrics {
        RateLimitMetrics {
            algorithm: Some(self.algorithm()),
            allowed_requests: self.counters.allowed(),
            blocked_requests: self.counters.blocked(),
            gauge: self.store.sample_count().unwrap_or(0) as f64,
        }
    }
}
