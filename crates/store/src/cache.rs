//! Sharded two-level cache keyed by content hash.
//!
//! The cache is the store's deduplication fabric. Entries have two residency
//! levels:
//!
//! - **strong**: the cache itself keeps the value alive
//! - **weak**: only external holders keep it alive; the cache can still hand
//!   out the shared instance while any holder remains
//!
//! Sweeps demote aged strong entries to weak, drop weak entries whose target
//! has died, and enforce the target size. [`TaggedCache::canonicalize`] is
//! the insert-or-return-existing primitive that guarantees at most one
//! in-memory instance per key, even under races.
//!
//! Shards are selected by the first key byte; keys are cryptographic hashes,
//! so the distribution is uniform by construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Number of independently locked shards. Must be a power of two.
const SHARD_COUNT: usize = 16;

/// Observation count past which hit/miss counters are halved on sweep, so
/// the reported hit rate tracks recent behavior.
const HIT_RATE_WINDOW: u64 = 65_536;

/// One cached value with its residency state.
struct CacheEntry<V> {
    /// Set while the entry is hot; cleared on demotion.
    strong: Option<Arc<V>>,
    /// Always points at the canonical instance, surviving demotion.
    weak: Weak<V>,
    /// Last touch/fetch/canonicalize, for LRU ordering.
    last_use: Instant,
}

impl<V> CacheEntry<V> {
    fn hot(value: &Arc<V>) -> Self {
        Self { strong: Some(Arc::clone(value)), weak: Arc::downgrade(value), last_use: Instant::now() }
    }

    /// Returns the live shared instance, if any holder (the cache included)
    /// still keeps it alive.
    fn live(&self) -> Option<Arc<V>> {
        match &self.strong {
            Some(value) => Some(Arc::clone(value)),
            None => self.weak.upgrade(),
        }
    }

    fn is_dead(&self) -> bool {
        self.strong.is_none() && self.weak.strong_count() == 0
    }
}

/// Sharded concurrent map with two-level residency and age/size eviction.
///
/// `K` is an opaque fixed-width identifier (a content hash); `V` is shared
/// as `Arc<V>` between the cache and all callers.
pub struct TaggedCache<K, V> {
    name: &'static str,
    shards: Vec<Mutex<HashMap<K, CacheEntry<V>>>>,
    target_size: AtomicUsize,
    target_age_secs: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TaggedCache<K, V>
where
    K: Eq + std::hash::Hash + AsRef<[u8]> + Clone,
{
    /// Creates a cache with the given tuning. A `target_size` of 0 disables
    /// the size bound; a `target_age_secs` of 0 demotes every strong entry
    /// at the next sweep.
    pub fn new(name: &'static str, target_size: usize, target_age_secs: u64) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            name,
            shards,
            target_size: AtomicUsize::new(target_size),
            target_age_secs: AtomicU64::new(target_age_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: &K) -> &Mutex<HashMap<K, CacheEntry<V>>> {
        let prefix = key.as_ref().first().copied().unwrap_or(0) as usize;
        &self.shards[prefix & (SHARD_COUNT - 1)]
    }

    /// Refreshes `last_use` if the key is resident with a live value.
    pub fn touch(&self, key: &K) -> bool {
        let mut entries = self.shard(key).lock();
        if let Some(entry) = entries.get_mut(key) {
            if entry.live().is_some() {
                entry.last_use = Instant::now();
                return true;
            }
        }
        false
    }

    /// Insert-or-return-existing.
    ///
    /// If the key is resident with a live value, `value` is replaced by the
    /// resident instance (the caller's copy should be dropped) and the entry
    /// is promoted to strong; returns `true`. Otherwise `value` is inserted
    /// as a hot entry; returns `false`.
    pub fn canonicalize(&self, key: K, value: &mut Arc<V>) -> bool {
        use std::collections::hash_map::Entry;

        let mut entries = self.shard(&key).lock();
        match entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if let Some(existing) = occupied.get().live() {
                    let entry = occupied.get_mut();
                    entry.strong = Some(Arc::clone(&existing));
                    entry.last_use = Instant::now();
                    *value = existing;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    true
                } else {
                    *occupied.get_mut() = CacheEntry::hot(value);
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    false
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::hot(value));
                self.misses.fetch_add(1, Ordering::Relaxed);
                false
            },
        }
    }

    /// Returns the shared instance for `key`, promoting a weak hit back to
    /// strong. Dead entries encountered on the probe are removed.
    pub fn fetch(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.shard(key).lock();
        if let Some(entry) = entries.get_mut(key) {
            if let Some(value) = entry.live() {
                entry.strong = Some(Arc::clone(&value));
                entry.last_use = Instant::now();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Sets the strong-residency bound, effective at the next sweep.
    pub fn set_target_size(&self, size: usize) {
        self.target_size.store(size, Ordering::Relaxed);
    }

    /// Sets the demotion age, effective at the next sweep.
    pub fn set_target_age(&self, secs: u64) {
        self.target_age_secs.store(secs, Ordering::Relaxed);
    }

    /// Maintenance pass: drops dead weak entries, demotes strong entries
    /// older than the target age, and enforces the size bound per shard
    /// (LRU within each shard). Runs on a timer external to the cache.
    pub fn sweep(&self) {
        let now = Instant::now();
        let target_age = Duration::from_secs(self.target_age_secs.load(Ordering::Relaxed));
        let target_size = self.target_size.load(Ordering::Relaxed);
        let shard_budget = if target_size == 0 { usize::MAX } else { target_size / SHARD_COUNT };

        let mut swept = 0usize;
        let mut demoted = 0usize;

        for shard in &self.shards {
            let mut entries = shard.lock();

            entries.retain(|_, entry| {
                if entry.is_dead() {
                    swept += 1;
                    false
                } else {
                    true
                }
            });

            for entry in entries.values_mut() {
                if entry.strong.is_some() && now.duration_since(entry.last_use) >= target_age {
                    entry.strong = None;
                    demoted += 1;
                }
            }

            let strong_count = entries.values().filter(|e| e.strong.is_some()).count();
            if strong_count > shard_budget {
                let mut by_age: Vec<(Instant, K)> = entries
                    .iter()
                    .filter(|(_, e)| e.strong.is_some())
                    .map(|(k, e)| (e.last_use, k.clone()))
                    .collect();
                by_age.sort_by_key(|(last_use, _)| *last_use);
                for (_, key) in by_age.into_iter().take(strong_count - shard_budget) {
                    if let Some(entry) = entries.get_mut(&key) {
                        entry.strong = None;
                        demoted += 1;
                    }
                }
            }
        }

        // Decay the hit-rate window so the ratio follows recent traffic.
        if self.hits.load(Ordering::Relaxed) + self.misses.load(Ordering::Relaxed) > HIT_RATE_WINDOW
        {
            self.hits.store(self.hits.load(Ordering::Relaxed) / 2, Ordering::Relaxed);
            self.misses.store(self.misses.load(Ordering::Relaxed) / 2, Ordering::Relaxed);
        }

        if swept > 0 || demoted > 0 {
            tracing::trace!(cache = self.name, swept, demoted, "cache sweep");
        }
    }

    /// Ratio of hits over the decayed observation window, in `[0, 1]`.
    pub fn hit_rate(&self) -> f32 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f32 / total as f32
    }

    /// Total resident entries, strong and weak.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Returns `true` when no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.lock().is_empty())
    }

    /// Strongly-held entries only.
    pub fn strong_len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().values().filter(|e| e.strong.is_some()).count()).sum()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            strong_entries: self.strong_len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            target_size: self.target_size.load(Ordering::Relaxed),
            target_age_secs: self.target_age_secs.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total resident entries (strong + weak).
    pub entries: usize,
    /// Strongly-held entries.
    pub strong_entries: usize,
    /// Hits in the current decay window.
    pub hits: u64,
    /// Misses in the current decay window.
    pub misses: u64,
    /// Configured strong-residency bound (0 = unbounded).
    pub target_size: usize,
    /// Configured demotion age in seconds.
    pub target_age_secs: u64,
}
