//! Relational backend (SQLite via rusqlite).
//!
//! One database file with a single `objects` table; hashes are stored as
//! 64-char lowercase hex for compatibility with stores written by the
//! original schema. All access serializes on the connection lock, and
//! `put_many` wraps a drain batch in one immediate transaction of cached
//! `INSERT OR IGNORE` statements.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hashvault_types::{Hash, Object};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use snafu::ResultExt;

use crate::error::{Result, SqlSnafu, StoreError};

use super::{Backend, RawRecord};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS objects (
    hash         TEXT PRIMARY KEY,
    kind         CHAR(1) NOT NULL,
    ledger_index INTEGER NOT NULL,
    payload      BLOB NOT NULL
)";

const INSERT: &str =
    "INSERT OR IGNORE INTO objects (hash, kind, ledger_index, payload) VALUES (?1, ?2, ?3, ?4)";

/// Hashed-object backend over a SQLite file.
pub struct RelationalBackend {
    conn: Mutex<Connection>,
    closed: AtomicBool,
}

impl RelationalBackend {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] when the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context(SqlSnafu)?;
        conn.pragma_update(None, "journal_mode", "WAL").context(SqlSnafu)?;
        conn.busy_timeout(Duration::from_secs(10)).context(SqlSnafu)?;
        conn.execute(SCHEMA, []).context(SqlSnafu)?;

        Ok(Self { conn: Mutex::new(conn), closed: AtomicBool::new(false) })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::BackendClosed);
        }
        Ok(())
    }
}

impl Backend for RelationalBackend {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn put(&self, object: &Object) -> Result<()> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(INSERT).context(SqlSnafu)?;
        stmt.execute(params![
            object.hash().to_hex(),
            object.kind().as_str(),
            object.ledger_index(),
            object.payload(),
        ])
        .context(SqlSnafu)?;
        Ok(())
    }

    fn put_many(&self, batch: &[Arc<Object>]) -> Result<()> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock();
        let tx =
            conn.transaction_with_behavior(TransactionBehavior::Immediate).context(SqlSnafu)?;
        {
            let mut stmt = tx.prepare_cached(INSERT).context(SqlSnafu)?;
            for object in batch {
                stmt.execute(params![
                    object.hash().to_hex(),
                    object.kind().as_str(),
                    object.ledger_index(),
                    object.payload(),
                ])
                .context(SqlSnafu)?;
            }
        }
        tx.commit().context(SqlSnafu)?;
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Option<RawRecord>> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT kind, ledger_index, payload FROM objects WHERE hash = ?1")
            .context(SqlSnafu)?;

        let row = stmt
            .query_row(params![hash.to_hex()], |row| {
                let kind: String = row.get(0)?;
                let ledger_index: i64 = row.get(1)?;
                let payload: Vec<u8> = row.get(2)?;
                Ok((kind, ledger_index, payload))
            })
            .optional()
            .context(SqlSnafu)?;

        Ok(row.map(|(kind, ledger_index, payload)| RawRecord {
            hash: *hash,
            kind_code: kind.as_bytes().first().copied().unwrap_or(0),
            ledger_index: ledger_index as u32,
            payload,
        }))
    }

    fn scan(&self, visit: &mut dyn FnMut(RawRecord)) -> Result<()> {
        self.ensure_open()?;
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT hash, kind, ledger_index, payload FROM objects")
            .context(SqlSnafu)?;

        let mut rows = stmt.query([]).context(SqlSnafu)?;
        while let Some(row) = rows.next().context(SqlSnafu)? {
            let hash_hex: String = row.get(0).context(SqlSnafu)?;
            let kind: String = row.get(1).context(SqlSnafu)?;
            let ledger_index: i64 = row.get(2).context(SqlSnafu)?;
            let payload: Vec<u8> = row.get(3).context(SqlSnafu)?;

            visit(RawRecord {
                // Unparsable keys surface as the zero sentinel for the
                // caller to skip.
                hash: Hash::from_hex(&hash_hex).unwrap_or(Hash::ZERO),
                kind_code: kind.as_bytes().first().copied().unwrap_or(0),
                ledger_index: ledger_index as u32,
                payload,
            });
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
