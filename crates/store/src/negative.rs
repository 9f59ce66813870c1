//! Bounded-TTL set of hashes known missing from the backend.
//!
//! A retrieve that falls through to the backend and misses records the hash
//! here so repeated probes for the same absent object skip the disk. Entries
//! expire after a TTL, and a store of the same hash removes its entry
//! immediately.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hashvault_types::Hash;
use parking_lot::Mutex;

/// TTL set of known-missing hashes.
pub struct NegativeCache {
    ttl: Duration,
    entries: Mutex<HashMap<Hash, Instant>>,
}

impl NegativeCache {
    /// Creates a cache whose entries expire after `ttl_secs`.
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl: Duration::from_secs(ttl_secs), entries: Mutex::new(HashMap::new()) }
    }

    /// Records `hash` as known-missing.
    pub fn add(&self, hash: Hash) {
        self.entries.lock().insert(hash, Instant::now());
    }

    /// Forgets `hash`, typically because it was just stored.
    pub fn del(&self, hash: &Hash) {
        self.entries.lock().remove(hash);
    }

    /// Returns `true` if `hash` is recorded and unexpired. An expired entry
    /// found on the probe is evicted.
    pub fn is_present(&self, hash: &Hash) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(hash) {
            Some(inserted_at) if inserted_at.elapsed() < self.ttl => true,
            Some(_) => {
                entries.remove(hash);
                false
            },
            None => false,
        }
    }

    /// Drops every expired entry. Runs on the same external timer as the
    /// object cache sweep.
    pub fn sweep(&self) {
        let ttl = self.ttl;
        self.entries.lock().retain(|_, inserted_at| inserted_at.elapsed() < ttl);
    }

    /// Number of recorded hashes, expired entries included until swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` when no hashes are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
