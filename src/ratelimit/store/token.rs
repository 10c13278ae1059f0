//! Token bucket state.

use tracing::debug;

use super::ClientMap;

/// A single client's token bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucket {
    /// Tokens currently available, never above the configured capacity
    pub tokens: f64,
    /// When tokens were last added (milliseconds)
    pub last_refill_millis: u64,
}

impl TokenBucket {
    /// A full bucket.
    pub fn full(capacity: f64, now_millis: u64) -> Self {
        Self {
            tokens: capacity,
            last_refill_millis: now_millis,
        }
    }
}

/// Token buckets indexed by client identifier.
#[derive(Debug)]
pub struct TokenBucketStore {
    buckets: ClientMap<TokenBucket>,
}

impl TokenBucketStore {
    pub fn new() -> Self {
        Self {
            buckets: ClientMap::new(),
        }
    }

    /// Run `f` against the client's bucket, creating a full one for a new client.
    pub fn with_bucket<R>(
        &self,
        client_id: &str,
        capacity: f64,
        now_millis: u64,
        f: impl FnOnce(&mut TokenBucket) -> R,
    ) -> R {
        self.buckets.with_entry(
            client_id,
            || {
                debug!(client_id, capacity, "Creating token bucket");
                TokenBucket::full(capacity, now_millis)
            },
            f,
        )
    }

    /// Copy of the client's bucket, if it has one.
    pub fn get(&self, client_id: &str) -> Option<TokenBucket> {
        self.buckets.read(client_id, |bucket| *bucket)
    }

    /// Token count of an arbitrary client's bucket.
    pub fn sample_tokens(&self) -> Option<f64> {
        self.buckets.sample(|bucket| bucket.tokens)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every bucket.
    pub fn reset(&self) {
        self.buckets.clear();
    }
}

impl Default for TokenBucketStore {
    fn default() -> Self {
        Self::new()
    }
}
