//! Fixed window counters.

use parking_lot::RwLock;
use tracing::debug;

use super::ClientMap;

/// Per-client request counters sharing one window.
///
/// There is a single window start for the whole store. When it expires every
/// client's counter is cleared together, so all clients roll over to the new
/// window at the same instant.
#[derive(Debug)]
pub struct FixedWindowStore {
    counters: ClientMap<u64>,
    /// Start of the current window (milliseconds); writers hold this while
    /// clearing so no increment lands in a window being discarded
    window_start: RwLock<u64>,
}

impl FixedWindowStore {
    /// Create a store whose first window opens at `now_millis`.
    pub fn new(now_millis: u64) -> Self {
        Self {
            counters: ClientMap::new(),
            window_start: RwLock::new(now_millis),
        }
    }

    /// Count one request from `client_id`, rolling the shared window over
    /// first if it has expired.
    ///
    /// Returns the client's count in the current window and the window start.
    pub fn increment(&self, client_id: &str, now_millis: u64, window_millis: u64) -> (u64, u64) {
        let expired = |start: u64| now_millis.saturating_sub(start) >= window_millis;

        {
            let start = self.window_start.read();
            if !expired(*start) {
                return (self.bump(client_id), *start);
            }
        }

        let mut start = self.window_start.write();
        if expired(*start) {
            debug!(
                previous_start = *start,
                now = now_millis,
                clients = self.counters.len(),
                "Fixed window expired, resetting all counters"
            );
            self.counters.clear();
            *start = now_millis;
        }
        (self.bump(client_id), *start)
    }

    fn bump(&self, client_id: &str) -> u64 {
        self.counters.with_entry(
            client_id,
            || 0,
            |count| {
                *count += 1;
                *count
            },
        )
    }

    /// The client's count in the current window, if it has one.
    pub fn count(&self, client_id: &str) -> Option<u64> {
        self.counters.read(client_id, |count| *count)
    }

    /// Count of an arbitrary client.
    pub fn sample_count(&self) -> Option<u64> {
        self.counters.sample(|count| *count)
    }

    pub fn window_start(&self) -> u64 {
        *self.window_start.read()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear every counter and open a new window at `now_millis`.
    pub fn reset(&self, now_millis: u64) {
        let mut start = self.window_start.write();
        self.counters.clear();
        *start = now_millis;
    }
}
