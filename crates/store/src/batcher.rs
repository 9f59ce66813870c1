//! Write batching with a generation barrier.
//!
//! Cache misses on the store path enqueue here instead of touching the
//! backend directly. A single drain job per store coalesces the queue into
//! backend transactions, amortizing transaction overhead. Waiters use a
//! generation counter rather than per-object futures: the drain claims the
//! whole queue, bumps the generation, and notifies before it writes, so a
//! waiter that saw `pending` knows its objects are inside a transaction
//! boundary once the generation moves.
//!
//! A failed backend write is logged and the batch stays cache-only; the
//! generation has already advanced, so waiters never hang on a broken
//! backend.

use std::sync::Arc;

use hashvault_types::Object;
use parking_lot::{Condvar, Mutex};

use crate::backend::Backend;
use crate::jobs::{JobKind, JobScheduler};

struct BatchState {
    queue: Vec<Arc<Object>>,
    /// True while a drain job is scheduled or running.
    pending: bool,
    /// Bumped once per drain pass, including the final empty pass.
    generation: u64,
}

/// Coalesces pending objects into backend transactions.
pub struct WriteBatcher {
    state: Mutex<BatchState>,
    write_done: Condvar,
    backend: Arc<dyn Backend>,
    scheduler: Arc<dyn JobScheduler>,
    batch_max: usize,
}

impl WriteBatcher {
    /// Creates a batcher writing to `backend`, draining at most `batch_max`
    /// objects per backend transaction.
    pub fn new(
        backend: Arc<dyn Backend>,
        scheduler: Arc<dyn JobScheduler>,
        batch_max: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(BatchState {
                queue: Vec::with_capacity(128),
                pending: false,
                generation: 0,
            }),
            write_done: Condvar::new(),
            backend,
            scheduler,
            batch_max: batch_max.max(1),
        })
    }

    /// Enqueues an object for durable write and schedules a drain if one is
    /// not already pending. The object must already be canonical in the
    /// positive cache so concurrent retrieves hit RAM before it lands on
    /// disk.
    pub fn submit(self: &Arc<Self>, object: Arc<Object>) {
        let schedule = {
            let mut state = self.state.lock();
            state.queue.push(object);
            if state.pending {
                false
            } else {
                state.pending = true;
                true
            }
        };

        if schedule {
            let batcher = Arc::clone(self);
            self.scheduler.spawn(JobKind::Write, "drain", Box::new(move || batcher.drain()));
        }
    }

    /// Drain loop body: repeatedly swaps the queue out and writes it, until
    /// a pass finds the queue empty.
    fn drain(&self) {
        loop {
            let batch = {
                let mut state = self.state.lock();
                let batch = std::mem::replace(&mut state.queue, Vec::with_capacity(128));
                state.generation += 1;
                self.write_done.notify_all();
                if batch.is_empty() {
                    state.pending = false;
                    return;
                }
                batch
            };

            tracing::trace!(count = batch.len(), backend = self.backend.name(), "bulk write");
            for chunk in batch.chunks(self.batch_max) {
                if let Err(err) = self.backend.put_many(chunk) {
                    // Objects stay resident in the cache; only durability is
                    // lost until a restart re-stores them.
                    tracing::error!(
                        error = %err,
                        count = chunk.len(),
                        "bulk write failed; batch remains cache-only"
                    );
                }
            }
        }
    }

    /// Blocks until writes pending at call time have reached a backend
    /// transaction: returns once no drain is pending, or the generation has
    /// advanced past the one observed at entry.
    pub fn wait_for_write(&self) {
        let mut state = self.state.lock();
        let generation = state.generation;
        while state.pending && state.generation == generation {
            self.write_done.wait(&mut state);
        }
    }

    /// Objects currently queued and not yet claimed by a drain.
    pub fn queued_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Completed drain passes.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hashvault_types::{Hash, ObjectKind};

    use super::*;
    use crate::error::{Result, StoreError};
    use crate::backend::RawRecord;
    use crate::jobs::{InlineScheduler, ThreadScheduler};

    /// Backend that counts batch writes; optionally fails them all.
    struct CountingBackend {
        rows: Mutex<Vec<Arc<Object>>>,
        put_many_calls: AtomicUsize,
        fail_writes: bool,
    }

    impl CountingBackend {
        fn new(fail_writes: bool) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(Vec::new()),
                put_many_calls: AtomicUsize::new(0),
                fail_writes,
            })
        }
    }

    impl Backend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn put(&self, object: &Object) -> Result<()> {
            self.rows.lock().push(Arc::new(object.clone()));
            Ok(())
        }

        fn put_many(&self, batch: &[Arc<Object>]) -> Result<()> {
            self.put_many_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StoreError::BackendClosed);
            }
            self.rows.lock().extend(batch.iter().cloned());
            Ok(())
        }

        fn get(&self, hash: &Hash) -> Result<Option<RawRecord>> {
            Ok(self.rows.lock().iter().find(|o| o.hash() == hash).map(|o| RawRecord {
                hash: *o.hash(),
                kind_code: o.kind().code(),
                ledger_index: o.ledger_index(),
                payload: o.payload().to_vec(),
            }))
        }

        fn scan(&self, _visit: &mut dyn FnMut(RawRecord)) -> Result<()> {
            Ok(())
        }

        fn close(&self) {}
    }

    fn object(n: u8) -> Arc<Object> {
        Arc::new(Object::from_payload(ObjectKind::Ledger, n as u32, vec![n; 8]))
    }

    #[test]
    fn test_submit_drains_to_backend() {
        let backend = CountingBackend::new(false);
        let batcher =
            WriteBatcher::new(backend.clone(), Arc::new(InlineScheduler), 128);

        batcher.submit(object(1));
        batcher.wait_for_write();

        assert_eq!(backend.rows.lock().len(), 1);
        assert_eq!(batcher.queued_len(), 0);
    }

    #[test]
    fn test_generation_advances_per_drain_pass() {
        let backend = CountingBackend::new(false);
        let batcher = WriteBatcher::new(backend, Arc::new(InlineScheduler), 128);

        assert_eq!(batcher.generation(), 0);
        batcher.submit(object(1));
        // Inline drain: one pass with the object, one final empty pass.
        assert_eq!(batcher.generation(), 2);
    }

    #[test]
    fn test_batch_chunking() {
        let backend = CountingBackend::new(false);
        let batcher = WriteBatcher::new(backend.clone(), Arc::new(InlineScheduler), 2);

        // Park the drain by enqueuing before any scheduler runs: with the
        // inline scheduler the first submit drains immediately, so push
        // directly into the queue to emulate a burst.
        {
            let mut state = batcher.state.lock();
            for n in 0..5u8 {
                state.queue.push(object(n));
            }
            state.pending = true;
        }
        batcher.drain();

        // 5 objects with batch_max=2 → 3 chunked transactions.
        assert_eq!(backend.put_many_calls.load(Ordering::SeqCst), 3);
        assert_eq!(backend.rows.lock().len(), 5);
    }

    #[test]
    fn test_wait_for_write_unblocks_on_failed_backend() {
        let backend = CountingBackend::new(true);
        let batcher = WriteBatcher::new(backend.clone(), Arc::new(InlineScheduler), 128);

        batcher.submit(object(1));
        // Must return despite every put_many failing.
        batcher.wait_for_write();

        assert_eq!(backend.put_many_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.rows.lock().len(), 0);
        // The generation still advanced, so later waiters never hang.
        assert_eq!(batcher.generation(), 2);
    }

    #[test]
    fn test_wait_for_write_idle_returns_immediately() {
        let backend = CountingBackend::new(false);
        let batcher = WriteBatcher::new(backend, Arc::new(ThreadScheduler), 128);
        batcher.wait_for_write();
    }

    #[test]
    fn test_concurrent_submitters_all_drain() {
        use std::thread;

        let backend = CountingBackend::new(false);
        let batcher = WriteBatcher::new(backend.clone(), Arc::new(ThreadScheduler), 16);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let batcher = Arc::clone(&batcher);
                thread::spawn(move || {
                    for i in 0..32u32 {
                        let n = (t * 32 + i) as u8;
                        batcher.submit(Arc::new(Object::from_payload(
                            ObjectKind::Transaction,
                            i,
                            vec![n, t as u8, i as u8],
                        )));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("submitter panicked");
        }
        batcher.wait_for_write();

        // The barrier releases at transaction claim, so give the final
        // backend write a moment to land before asserting.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while backend.rows.lock().len() < 256 && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(backend.rows.lock().len(), 256);
        assert_eq!(batcher.queued_len(), 0);
    }
}
