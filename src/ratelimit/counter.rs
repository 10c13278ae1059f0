//! Admission counters shared by every algorithm.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative admitted/rejected counts for one limiter.
///
/// Updates are lock-free; the counts only ever grow until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct RequestCounters {
    /// Requests admitted since the last reset
    allowed: AtomicU64,
    /// Requests refused since the last reset
    blocked: AtomicU64,
}

impl RequestCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decision.
    pub fn record(&self, allowed: bool) {
        let counter = if allowed { &self.allowed } else { &self.blocked };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of admitted requests.
    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::SeqCst)
    }

    /// Number of refused requests.
    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Zero both counts.
    pub fn reset(&self) {
        self.allowed.store(0, Ordering::SeqCst);
        self.blocked.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_splits_by_outcome() {
        let counters = RequestCounters::new();

        counters.record(true);
        counters.record(true);
        counters.record(false);

        assert_eq!(counters.allowed(), 2);
        assert_eq!(counters.blocked(), 1);
    }

    #[test]
    fn test_reset_zeroes_counts() {
        let counters = RequestCounters::new();
        counters.record(true);
        counters.record(false);

        counters.reset();

        assert_eq!(counters.allowed(), 0);
        assert_eq!(counters.blocked(), 0);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let counters = RequestCounters::new();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for i in 0..1000 {
                        counters.record(i % 2 == 0);
                    }
                });
            }
        });

        assert_eq!(counters.allowed(), 4000);
        assert_eq!(counters.blocked(), 4000);
    }
}
