//! Ordered embedded backend (redb).
//!
//! Keys are the raw 32-byte hash; values use the packed
//! `kind || ledger_index || payload` layout from the module docs. Reads also
//! accept 64-char hex keys so stores written by the legacy text layout stay
//! readable; new writes always use raw keys.
//!
//! redb write transactions are crash-atomic, so `put_many` maps a drain
//! batch onto a single transaction.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashvault_types::{Hash, Object, HASH_LEN};
use redb::{Database, ReadableTable, TableDefinition};
use snafu::ResultExt;

use crate::error::{
    CommitSnafu, OpenSnafu, Result, StorageSnafu, StoreError, TableSnafu, TransactionSnafu,
};

use super::{decode_value, encode_value, Backend, RawRecord};

/// Object rows: hash → packed record.
const OBJECTS: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new("objects");

/// Hashed-object backend over a redb database file.
pub struct OrderedBackend {
    db: Database,
    closed: AtomicBool,
}

impl OrderedBackend {
    /// Opens (or creates) a database at `path` and ensures the objects
    /// table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the file cannot be opened, or an
    /// engine error if the initial transaction fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path)
            .context(OpenSnafu { path: path.display().to_string() })?;

        // Create the table up front so reads never race table creation.
        let txn = db.begin_write().context(TransactionSnafu)?;
        txn.open_table(OBJECTS).context(TableSnafu)?;
        txn.commit().context(CommitSnafu)?;

        Ok(Self { db, closed: AtomicBool::new(false) })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::BackendClosed);
        }
        Ok(())
    }

    fn record_from_row(key: &[u8], value: &[u8]) -> RawRecord {
        let hash = parse_key(key);
        match decode_value(value) {
            Some((kind_code, ledger_index, payload)) => {
                RawRecord { hash, kind_code, ledger_index, payload }
            },
            // A short value cannot carry a valid kind; surface it as one.
            None => RawRecord { hash, kind_code: 0, ledger_index: 0, payload: Vec::new() },
        }
    }
}

/// Decodes a stored key: raw 32 bytes, or the legacy 64-char hex form.
fn parse_key(key: &[u8]) -> Hash {
    if key.len() == HASH_LEN {
        let mut bytes = [0u8; HASH_LEN];
        bytes.copy_from_slice(key);
        return Hash::from_bytes(bytes);
    }
    std::str::from_utf8(key)
        .ok()
        .and_then(|s| Hash::from_hex(s).ok())
        .unwrap_or(Hash::ZERO)
}

impl Backend for OrderedBackend {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn put(&self, object: &Object) -> Result<()> {
        self.ensure_open()?;
        let value = encode_value(object);

        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(OBJECTS).context(TableSnafu)?;
            table
                .insert(object.hash().as_bytes().as_slice(), value.as_slice())
                .context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }

    fn put_many(&self, batch: &[Arc<Object>]) -> Result<()> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(OBJECTS).context(TableSnafu)?;
            for object in batch {
                let value = encode_value(object);
                table
                    .insert(object.hash().as_bytes().as_slice(), value.as_slice())
                    .context(StorageSnafu)?;
            }
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Option<RawRecord>> {
        self.ensure_open()?;

        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(OBJECTS).context(TableSnafu)?;

        let raw = table.get(hash.as_bytes().as_slice()).context(StorageSnafu)?;
        if let Some(guard) = raw {
            return Ok(Some(Self::record_from_row(hash.as_bytes(), guard.value())));
        }

        // Legacy layout keyed rows by the hex form of the hash.
        let hex_key = hash.to_hex();
        let legacy = table.get(hex_key.as_bytes()).context(StorageSnafu)?;
        Ok(legacy.map(|guard| Self::record_from_row(hash.as_bytes(), guard.value())))
    }

    fn scan(&self, visit: &mut dyn FnMut(RawRecord)) -> Result<()> {
        self.ensure_open()?;

        let txn = self.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(OBJECTS).context(TableSnafu)?;

        for row in table.iter().context(StorageSnafu)? {
            let (key, value) = row.context(StorageSnafu)?;
            visit(Self::record_from_row(key.value(), value.value()));
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
