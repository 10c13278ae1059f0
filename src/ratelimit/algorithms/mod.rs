//! Admission algorithm implementations.

mod fixed_window;
mod leaky_bucket;
mod sliding_window_log;
mod token_bucket;

pub use fixed_window::FixedWindowLimiter;
pub use leaky_bucket::LeakyBucketLimiter;
pub use sliding_window_log::SlidingWindowLogLimiter;
pub use token_bucket::TokenBucketLimiter;

use super::decision::{RateLimitMetrics, RateLimitResult};
use super::policy::{Algorithm, Policy};
use crate::error::Result;

/// Contract shared by every admission algorithm.
///
/// Implementations own their per-client state and their admitted/rejected
/// counters. All methods are synchronous and take `&self`; state is
/// protected internally so one instance can serve many threads.
pub trait RateLimiter: Send + Sync {
    /// Which algorithm this limiter implements.
    fn algorithm(&self) -> Algorithm;

    /// Replace the policy parameters this limiter reads.
    fn configure(&self, policy: &Policy);

    /// Decide whether one request from `client_id` is admitted.
    ///
    /// Fails with `NotConfigured` if [`configure`](Self::configure) was never called.
    fn allow_request(&self, client_id: &str) -> Result<RateLimitResult>;

    /// Drop all per-client state and zero the counters.
    fn reset(&self);

    /// Snapshot of the counters plus a sampled gauge.
    fn metrics(&self) -> RateLimitMetrics;
}
