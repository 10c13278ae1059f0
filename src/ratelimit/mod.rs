//! Rate limiting logic and state management.

pub mod algorithms;
pub mod clock;
pub mod store;

mod counter;
mod decision;
mod factory;
mod manager;
mod policy;

pub use algorithms::RateLimiter;
pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::RequestCounters;
pub use decision::{RateLimitMetrics, RateLimitResult, BUCKET_RETRY_AFTER_MILLIS};
pub use factory::RateLimiterFactory;
pub use manager::RateLimiterManager;
pub use policy::{Algorithm, Policy};
