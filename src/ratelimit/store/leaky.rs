//! Leaky bucket state.

use tracing::debug;

use super::ClientMap;

/// A single client's leaky bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakyBucket {
    /// Units currently held
    pub current_size: u64,
    /// When the bucket last drained (milliseconds)
    pub last_leak_millis: u64,
}

impl LeakyBucket {
    /// An empty bucket.
    pub fn empty(now_millis: u64) -> Self {
        Self {
            current_size: 0,
            last_leak_millis: now_millis,
        }
    }
}

/// Leaky buckets indexed by client identifier.
#[derive(Debug)]
pub struct LeakyBucketStore {
    buckets: ClientMap<LeakyBucket>,
}

impl LeakyBucketStore {
    pub fn new() -> Self {
        Self {
            buckets: ClientMap::new(),
        }
    }

    /// Run `f` against the client's bucket, creating an empty one for a new client.
    pub fn with_bucket<R>(
        &self,
        client_id: &str,
        now_millis: u64,
        f: impl FnOnce(&mut LeakyBucket) -> R,
    ) -> R {
        self.buckets.with_entry(
            client_id,
            || {
                debug!(client_id, "Creating leaky bucket");
                LeakyBucket::empty(now_millis)
            },
            f,
        )
    }

    pub fn get(&self, client_id: &str) -> Option<LeakyBucket> {
        self.buckets.read(client_id, |bucket| *bucket)
    }

    /// Size of an arbitrary client's bucket.
    pub fn sample_size(&self) -> Option<u64> {
        self.buckets.sample(|bucket| bucket.current_size)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.buckets.clear();
    }
}

impl Default for LeakyBucketStore {
    fn default() -> Self {
        Self::new()
    }
}
