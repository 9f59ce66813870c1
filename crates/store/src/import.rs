//! Streaming import from a foreign object store.
//!
//! Every row is re-verified before admission: zero-hash rows, rows with
//! unrecognized kind bytes, and rows whose payload digest does not match
//! their key are dropped with a warning. Rows the store can already resolve
//! are counted but not re-stored. Import is correctness-critical only in
//! that verification happens before admission; it is not a hot path.

use hashvault_types::{sha512_half, ObjectKind};

use crate::backend::Backend;
use crate::error::Result;
use crate::store::HashedObjectStore;

/// Rows between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Streams all valid objects from `foreign` into `store`.
///
/// Returns the number of newly admitted objects. Waits for the write
/// barrier before returning, so the imported rows are durable on completion.
///
/// # Errors
///
/// Returns an engine error if the foreign backend cannot be scanned;
/// individual bad rows are skipped, not fatal.
pub fn import_backend(store: &HashedObjectStore, foreign: &dyn Backend) -> Result<usize> {
    let mut imported = 0usize;
    let mut already_present = 0usize;
    let mut dropped = 0usize;

    foreign.scan(&mut |record| {
        if record.hash.is_zero() {
            tracing::warn!("zero hash in import source, skipping row");
            dropped += 1;
            return;
        }

        if store.retrieve(&record.hash).is_some() {
            already_present += 1;
        } else {
            let kind = match ObjectKind::try_from(record.kind_code) {
                Ok(kind) => kind,
                Err(_) => {
                    tracing::warn!(
                        hash = %record.hash,
                        code = record.kind_code,
                        "invalid kind byte in import source, skipping row"
                    );
                    dropped += 1;
                    return;
                },
            };

            let digest = sha512_half(&record.payload);
            if digest != record.hash {
                tracing::warn!(
                    hash = %record.hash,
                    %digest,
                    "digest mismatch in import source, skipping row"
                );
                dropped += 1;
                return;
            }

            store.store(kind, record.ledger_index, record.payload, record.hash);
            imported += 1;
        }

        if (imported + already_present) % PROGRESS_INTERVAL == PROGRESS_INTERVAL - 1 {
            tracing::info!(imported, already_present, "import in progress");
        }
    })?;

    tracing::info!(imported, already_present, dropped, "import complete");
    store.wait_for_write();
    Ok(imported)
}
