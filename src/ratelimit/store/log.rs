//! Sliding-window request logs.

use std::collections::VecDeque;
use tracing::debug;

use super::ClientMap;

/// Request timestamps per client, oldest first.
///
/// A client's whole evict, admit and append sequence runs under its own
/// entry guard, so clients never serialize behind one another.
#[derive(Debug)]
pub struct SlidingWindowStore {
    logs: ClientMap<VecDeque<u64>>,
}

impl SlidingWindowStore {
    pub fn new() -> Self {
        Self {
            logs: ClientMap::new(),
        }
    }

    /// Run `f` against the client's log, creating an empty one for a new client.
    pub fn with_log<R>(&self, client_id: &str, f: impl FnOnce(&mut VecDeque<u64>) -> R) -> R {
        self.logs.with_entry(
            client_id,
            || {
                debug!(client_id, "Creating request log");
                VecDeque::new()
            },
            f,
        )
    }

    /// Copy of the client's timestamps, oldest first.
    pub fn timestamps(&self, client_id: &str) -> Option<Vec<u64>> {
        self.logs
            .read(client_id, |log| log.iter().copied().collect())
    }

    /// Length of an arbitrary client's log.
    pub fn sample_len(&self) -> Option<usize> {
        self.logs.sample(VecDeque::len)
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.logs.clear();
    }
}

impl Default for SlidingWindowStore {
    fn default() -> Self {
        Self::new()
    }
}
