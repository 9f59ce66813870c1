//! The hashed-object store façade.
//!
//! Composes the shared cache, the negative cache, the write batcher, and a
//! durable backend into the store/retrieve surface consumers use:
//!
//! ```text
//! store()    → cache touch → canonicalize → batcher → backend
//! retrieve() → cache → negative cache → backend → canonicalize
//! ```
//!
//! Transient backend faults never surface to callers; the store degrades to
//! a cache-only view and logs. The only hard error on the hot path is a
//! digest mismatch in `store`, which is a caller bug and a debug assertion.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use hashvault_types::{sha512_half, BackendKind, Hash, Object, ObjectKind, StoreConfig};

use crate::backend::{self, Backend};
use crate::batcher::WriteBatcher;
use crate::cache::{CacheStats, TaggedCache};
use crate::error::Result;
use crate::import;
use crate::jobs::{JobScheduler, ThreadScheduler};
use crate::negative::NegativeCache;

/// Content-addressed store of hashed objects.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct HashedObjectStore {
    cache: TaggedCache<Hash, Object>,
    negative: NegativeCache,
    backend: Option<Arc<dyn Backend>>,
    batcher: Option<Arc<WriteBatcher>>,
    paranoid: bool,
}

impl HashedObjectStore {
    /// Opens the configured backend at `path` with a thread-per-job
    /// scheduler.
    ///
    /// # Errors
    ///
    /// Returns an engine error when the backend cannot be opened.
    pub fn open(config: &StoreConfig, path: impl AsRef<Path>) -> Result<Self> {
        let backend = backend::open(config.backend, path.as_ref())?;
        Ok(Self::with_backend(config, backend, Arc::new(ThreadScheduler)))
    }

    /// Builds a store over an already-open backend and an injected
    /// scheduler. This is the seam embeds use to supply their worker pool.
    pub fn with_backend(
        config: &StoreConfig,
        backend: Arc<dyn Backend>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        let batcher = WriteBatcher::new(Arc::clone(&backend), scheduler, config.batch_max);
        Self {
            cache: Self::build_cache(config),
            negative: NegativeCache::new(config.negative_cache_ttl_secs),
            backend: Some(backend),
            batcher: Some(batcher),
            paranoid: config.paranoid_verify,
        }
    }

    /// Builds a store with no durable backend. `store` reports success
    /// without persisting and `retrieve` serves only the cache; for tests.
    pub fn cache_only(config: &StoreConfig) -> Self {
        Self {
            cache: Self::build_cache(config),
            negative: NegativeCache::new(config.negative_cache_ttl_secs),
            backend: None,
            batcher: None,
            paranoid: config.paranoid_verify,
        }
    }

    fn build_cache(config: &StoreConfig) -> TaggedCache<Hash, Object> {
        TaggedCache::new("hashed_objects", config.cache_target_size, config.cache_target_age_secs)
    }

    /// Admits an object.
    ///
    /// The caller asserts that `hash` is the digest of `payload`; in debug
    /// builds this is checked. Returns `true` when this call newly admitted
    /// the object, `false` when it was already resident (whether found by
    /// the initial cache probe or raced in by another thread).
    pub fn store(&self, kind: ObjectKind, ledger_index: u32, payload: Vec<u8>, hash: Hash) -> bool {
        let Some(batcher) = &self.batcher else {
            tracing::trace!(%hash, "store: no backend");
            return true;
        };

        if self.cache.touch(&hash) {
            tracing::trace!(%hash, "store: in cache");
            return false;
        }

        debug_assert_eq!(sha512_half(&payload), hash, "asserted hash must match payload digest");

        let mut object = Arc::new(Object::new(kind, ledger_index, payload, hash));
        let existed = self.cache.canonicalize(hash, &mut object);
        if !existed {
            batcher.submit(object);
        }
        self.negative.del(&hash);
        !existed
    }

    /// Looks an object up by hash: positive cache, then negative cache,
    /// then backend, filling caches on the way back.
    pub fn retrieve(&self, hash: &Hash) -> Option<Arc<Object>> {
        if let Some(object) = self.cache.fetch(hash) {
            return Some(object);
        }

        if self.negative.is_present(hash) {
            return None;
        }

        let backend = self.backend.as_ref()?;

        let started = Instant::now();
        let record = match backend.get(hash) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.negative.add(*hash);
                tracing::trace!(%hash, "fetch: not in backend");
                return None;
            },
            Err(err) => {
                // Degrade to a miss; the negative cache keeps a flapping
                // backend from being hammered.
                tracing::warn!(%hash, error = %err, "backend read failed, treating as missing");
                self.negative.add(*hash);
                return None;
            },
        };
        let elapsed = started.elapsed();

        let Ok(kind) = ObjectKind::try_from(record.kind_code) else {
            tracing::error!(%hash, code = record.kind_code, "corrupt record: invalid kind byte");
            self.negative.add(*hash);
            return None;
        };

        if self.paranoid && sha512_half(&record.payload) != *hash {
            tracing::error!(%hash, "corrupt record: payload digest mismatch");
            self.negative.add(*hash);
            return None;
        }

        let mut object = Arc::new(Object::new(kind, record.ledger_index, record.payload, *hash));
        self.cache.canonicalize(*hash, &mut object);
        tracing::trace!(%hash, elapsed_us = elapsed.as_micros() as u64, "fetch: in backend");
        Some(object)
    }

    /// Blocks until writes pending at call time have reached a backend
    /// transaction. No-op without a backend.
    pub fn wait_for_write(&self) {
        if let Some(batcher) = &self.batcher {
            batcher.wait_for_write();
        }
    }

    /// Retunes the cache; effective at the next sweep.
    pub fn tune(&self, cache_target_size: usize, cache_target_age_secs: u64) {
        self.cache.set_target_size(cache_target_size);
        self.cache.set_target_age(cache_target_age_secs);
    }

    /// Runs one maintenance pass over both caches. Drive this from a
    /// periodic timer.
    pub fn sweep(&self) {
        self.cache.sweep();
        self.negative.sweep();
    }

    /// Cache hit rate over the recent window, in `[0, 1]`.
    pub fn hit_rate(&self) -> f32 {
        self.cache.hit_rate()
    }

    /// Streams every valid object out of a foreign backend into this store,
    /// re-verifying digests. Returns the number of newly admitted objects;
    /// durable on return.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the foreign backend cannot be opened or
    /// scanned.
    pub fn import(&self, path: impl AsRef<Path>, kind: BackendKind) -> Result<usize> {
        let path = path.as_ref();
        tracing::warn!(path = %path.display(), "importing hashed objects");
        let foreign = backend::open(kind, path)?;
        let imported = import::import_backend(self, foreign.as_ref())?;
        foreign.close();
        Ok(imported)
    }

    /// Point-in-time counters for observability.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            cache: self.cache.stats(),
            negative_entries: self.negative.len(),
            queued_writes: self.batcher.as_ref().map_or(0, |b| b.queued_len()),
            write_generation: self.batcher.as_ref().map_or(0, |b| b.generation()),
        }
    }

    /// Drains pending writes and shuts the backend down. Further backend
    /// reads fail and the store serves only its cache.
    pub fn close(&self) {
        self.wait_for_write();
        if let Some(backend) = &self.backend {
            backend.close();
        }
    }
}

/// Store-wide statistics snapshot.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Object cache counters.
    pub cache: CacheStats,
    /// Hashes currently marked known-missing.
    pub negative_entries: usize,
    /// Objects queued for durable write.
    pub queued_writes: usize,
    /// Completed drain passes.
    pub write_generation: u64,
}
