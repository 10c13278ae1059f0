//! Algorithm selection.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::algorithms::{
    FixedWindowLimiter, LeakyBucketLimiter, RateLimiter, SlidingWindowLogLimiter,
    TokenBucketLimiter,
};
use super::clock::Clock;
use super::policy::Algorithm;
use crate::error::{Result, WardenError};

/// Maps algorithm names to registered limiter instances.
///
/// Each limiter is created once and reused across configurations, so its
/// state persists while another algorithm is active.
pub struct RateLimiterFactory {
    limiters: HashMap<Algorithm, Arc<dyn RateLimiter>>,
}

impl RateLimiterFactory {
    /// Register one instance of every algorithm, all reading `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_limiters([
            Arc::new(FixedWindowLimiter::new(clock.clone())) as Arc<dyn RateLimiter>,
            Arc::new(TokenBucketLimiter::new(clock.clone())),
            Arc::new(SlidingWindowLogLimiter::new(clock.clone())),
            Arc::new(LeakyBucketLimiter::new(clock)),
        ])
    }

    /// Register an explicit set of limiters, keyed by the algorithm each
    /// reports. A later limiter replaces an earlier one of the same kind.
    pub fn with_limiters<I>(limiters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn RateLimiter>>,
    {
        let limiters: HashMap<_, _> = limiters
            .into_iter()
            .map(|limiter| (limiter.algorithm(), limiter))
            .collect();

        let mut loaded: Vec<_> = limiters.keys().map(Algorithm::as_str).collect();
        loaded.sort_unstable();
        info!(limiters = ?loaded, "Loaded rate limiters");

        Self { limiters }
    }

    /// Resolve a case-insensitive algorithm name to its limiter.
    pub fn get_limiter(&self, name: &str) -> Result<Arc<dyn RateLimiter>> {
        let algorithm: Algorithm = name.parse()?;
        self.limiter(algorithm)
            .ok_or(WardenError::NoImplementation(algorithm))
    }

    /// The limiter registered for `algorithm`, if any.
    pub fn limiter(&self, algorithm: Algorithm) -> Option<Arc<dyn RateLimiter>> {
        self.limiters.get(&algorithm).cloned()
    }
}
