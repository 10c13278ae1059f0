//! Ratewarden - In-memory Rate Limiting Service
//!
//! This crate decides, per client identifier, whether to admit or reject a
//! request under a single global quota policy. Four admission algorithms are
//! available (fixed window, token bucket, sliding-window log, leaky bucket) and
//! the active one can be swapped at runtime through the [`ratelimit::RateLimiterManager`].

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
