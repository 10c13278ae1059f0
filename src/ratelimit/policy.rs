//! Rate limit policy configuration.
//!
//! A policy names one admission algorithm and carries the numeric parameters
//! for all of them; each algorithm reads only the fields it cares about.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{Result, WardenError};

/// The admission algorithms the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    /// Counter reset at fixed intervals
    FixedWindow,
    /// Continuously refilled bucket of tokens
    TokenBucket,
    /// Exact log of recent request timestamps
    SlidingWindowLog,
    /// Bucket that fills per request and drains at a fixed rate
    LeakyBucket,
}

impl Algorithm {
    /// Every algorithm, in declaration order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::FixedWindow,
        Algorithm::TokenBucket,
        Algorithm::SlidingWindowLog,
        Algorithm::LeakyBucket,
    ];

    /// The canonical upper snake case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::FixedWindow => "FIXED_WINDOW",
            Algorithm::TokenBucket => "TOKEN_BUCKET",
            Algorithm::SlidingWindowLog => "SLIDING_WINDOW_LOG",
            Algorithm::LeakyBucket => "LEAKY_BUCKET",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = WardenError;

    /// Parse an algorithm name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| WardenError::InvalidAlgorithm(s.to_string()))
    }
}

/// A complete rate limit policy.
///
/// The algorithm is kept as the raw name supplied by the caller so that an
/// unknown name can be reported when the policy is installed. Lowercased and
/// snake case spellings of the field names are accepted as well, since the
/// layered configuration loader folds key case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Name of the algorithm to run
    pub algorithm: String,
    /// Maximum requests per window (fixed window, sliding-window log)
    #[serde(default)]
    pub limit: u64,
    /// Window length in seconds (fixed window, sliding-window log)
    #[serde(default, alias = "windowsizeinseconds", alias = "window_size_in_seconds")]
    pub window_size_in_seconds: u64,
    /// Refill or leak rate in units per second (token bucket, leaky bucket)
    #[serde(default, alias = "refillrate", alias = "refill_rate")]
    pub refill_rate: f64,
    /// Maximum bucket size (token bucket, leaky bucket)
    #[serde(default)]
    pub capacity: u64,
}

impl Policy {
    /// Create a policy for `algorithm` with every numeric field zeroed.
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            limit: 0,
            window_size_in_seconds: 0,
            refill_rate: 0.0,
            capacity: 0,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_size_in_seconds = secs;
        self
    }

    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.refill_rate = rate;
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Load a policy from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policy");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a policy from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| WardenError::Config(format!("Failed to parse rate limit policy: {}", e)))
    }

    /// Resolve the algorithm name.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm.parse()
    }

    /// The window length in milliseconds.
    pub fn window_millis(&self) -> u64 {
        self.window_size_in_seconds.saturating_mul(1000)
    }

    /// Check the values every algorithm relies on.
    pub fn validate(&self) -> Result<()> {
        if !self.refill_rate.is_finite() || self.refill_rate < 0.0 {
            return Err(WardenError::InvalidPolicy(format!(
                "refillRate must be a non-negative number, got {}",
                self.refill_rate
            )));
        }
        Ok(())
    }
}
