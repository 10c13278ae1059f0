//! Active policy management.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, trace, warn};

use super::algorithms::RateLimiter;
use super::clock::{Clock, SystemClock};
use super::decision::{RateLimitMetrics, RateLimitResult};
use super::factory::RateLimiterFactory;
use super::policy::{Algorithm, Policy};
use crate::error::{Result, WardenError};

/// Holds the single active limiter and routes requests to it.
///
/// This struct is thread-safe and can be shared across multiple tasks.
/// Requests hold a shared lock for the duration of a decision; reconfiguring
/// takes the lock exclusively, so no decision ever straddles two policies.
pub struct RateLimiterManager {
    /// Registered limiter instances
    factory: RateLimiterFactory,
    /// The limiter requests are routed to, `None` until first configured
    active: RwLock<Option<Arc<dyn RateLimiter>>>,
}

impl RateLimiterManager {
    /// Create a manager with every algorithm available and nothing active.
    pub fn new(factory: RateLimiterFactory) -> Self {
        Self {
            factory,
            active: RwLock::new(None),
        }
    }

    /// Create a manager whose limiters all read `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(RateLimiterFactory::new(clock))
    }

    /// Install `policy` as the active policy.
    ///
    /// The selected limiter is configured and its state and counters wiped.
    /// On failure the previously active policy stays in place untouched.
    pub fn configure(&self, policy: &Policy) -> Result<Algorithm> {
        let mut active = self.active.write();

        let limiter = policy
            .validate()
            .and_then(|()| self.factory.get_limiter(&policy.algorithm))
            .inspect_err(|e| warn!(algorithm = %policy.algorithm, error = %e, "Refusing rate limit policy"))?;

        limiter.configure(policy);
        limiter.reset();

        let algorithm = limiter.algorithm();
        *active = Some(limiter);

        info!(
            algorithm = %algorithm,
            limit = policy.limit,
            window_secs = policy.window_size_in_seconds,
            refill_rate = policy.refill_rate,
            capacity = policy.capacity,
            "Rate limit policy installed"
        );
        Ok(algorithm)
    }

    /// Decide whether one request from `client_id` is admitted.
    pub fn handle(&self, client_id: &str) -> Result<RateLimitResult> {
        let active = self.active.read();
        let limiter = active.as_ref().ok_or(WardenError::NotConfigured)?;

        let result = limiter.allow_request(client_id)?;
        trace!(
            client_id,
            allowed = result.allowed,
            remaining = result.remaining,
            "Rate limit decision made"
        );
        Ok(result)
    }

    /// Metrics of the active limiter, or an empty snapshot when unconfigured.
    pub fn metrics(&self) -> RateLimitMetrics {
        self.active
            .read()
            .as_ref()
            .map(|limiter| limiter.metrics())
            .unwrap_or_else(RateLimitMetrics::empty)
    }

    /// The algorithm currently receiving requests.
    pub fn active_algorithm(&self) -> Option<Algorithm> {
        self.active.read().as_ref().map(|limiter| limiter.algorithm())
    }

    /// The registered limiters, active or not.
    pub fn factory(&self) -> &RateLimiterFactory {
        &self.factory
    }
}

impl Default for RateLimiterManager {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }
}
