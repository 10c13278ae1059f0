//! Per-client state stores.
//!
//! Every algorithm owns one store mapping a client identifier to that
//! algorithm's state record. Records are created lazily on the first request
//! from a client and live until the store is reset. Mutation always happens
//! under the map's entry guard, so the read-modify-write of a compound record
//! (token count plus timestamp, say) is atomic per client while unrelated
//! clients on other shards proceed in parallel.

mod leaky;
mod log;
mod token;
mod window;

pub use leaky::{LeakyBucket, LeakyBucketStore};
pub use log::SlidingWindowStore;
pub use token::{TokenBucket, TokenBucketStore};
pub use window::FixedWindowStore;

use dashmap::DashMap;

/// Sharded client-id to state map shared by the bucket and log stores.
#[derive(Debug)]
pub(crate) struct ClientMap<S> {
    entries: DashMap<String, S>,
}

impl<S> ClientMap<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Run `f` with exclusive access to the client's record, creating it with
    /// `init` first if the client is new.
    pub(crate) fn with_entry<R>(
        &self,
        client_id: &str,
        init: impl FnOnce() -> S,
        f: impl FnOnce(&mut S) -> R,
    ) -> R {
        if let Some(mut entry) = self.entries.get_mut(client_id) {
            return f(&mut entry);
        }
        let mut entry = self.entries.entry(client_id.to_string()).or_insert_with(init);
        f(&mut entry)
    }

    /// Read the client's record without creating it.
    pub(crate) fn read<R>(&self, client_id: &str, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.entries.get(client_id).map(|entry| f(&entry))
    }

    /// Read whichever record the map yields first.
    pub(crate) fn sample<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.entries.iter().next().map(|entry| f(entry.value()))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }
}
