//! Admission decisions and metrics snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::policy::Algorithm;

/// Retry hint used by the bucket algorithms when a request is refused.
pub const BUCKET_RETRY_AFTER_MILLIS: u64 = 1000;

/// The outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    /// Whether the request was admitted
    pub allowed: bool,
    /// The algorithm that made the decision
    pub algorithm: Algorithm,
    /// Estimate of how many more requests would currently be admitted
    pub remaining: u64,
    /// How long the caller should wait before retrying (0 when allowed)
    pub retry_after_millis: u64,
    /// Algorithm specific diagnostics
    pub metadata: BTreeMap<String, Value>,
}

impl RateLimitResult {
    /// Build a result, zeroing the retry hint for admitted requests.
    pub fn new(allowed: bool, algorithm: Algorithm, remaining: u64, retry_after_millis: u64) -> Self {
        Self {
            allowed,
            algorithm,
            remaining,
            retry_after_millis: if allowed { 0 } else { retry_after_millis },
            metadata: BTreeMap::new(),
        }
    }

    /// Attach a diagnostic value.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Aggregate admission counts for the active algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitMetrics {
    /// The active algorithm, `None` before the first configuration
    pub algorithm: Option<Algorithm>,
    /// Requests admitted since the policy was installed
    pub allowed_requests: u64,
    /// Requests refused since the policy was installed
    pub blocked_requests: u64,
    /// Fill level sampled from one client's state
    #[serde(rename = "remainingTokens")]
    pub gauge: f64,
}

impl RateLimitMetrics {
    /// The snapshot reported when nothing is configured.
    pub fn empty() -> Self {
        Self::default()
    }
}
