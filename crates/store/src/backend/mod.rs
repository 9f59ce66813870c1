//! Durable backend abstraction.
//!
//! The backend trait abstracts the key-value engine beneath the store,
//! allowing an ordered embedded engine (redb) and a relational engine
//! (SQLite) behind one interface.
//!
//! # Record format
//!
//! Both engines persist the same logical row:
//!
//! ```text
//! hash (32 bytes / 64 hex chars) -> kind (1 byte) || ledger_index (4 bytes BE) || payload
//! ```
//!
//! The ordered engine packs the value bytes directly; the relational engine
//! splits them into columns. Reads return the raw kind byte; classifying an
//! unrecognized code as corruption is the caller's job, so a legacy or
//! damaged row never aborts a scan.

mod ordered;
mod relational;

use std::path::Path;
use std::sync::Arc;

pub use ordered::OrderedBackend;
pub use relational::RelationalBackend;

use hashvault_types::{BackendKind, Hash, Object};

use crate::error::Result;

/// Length of the fixed value header: kind byte plus big-endian ledger index.
pub const VALUE_HEADER_LEN: usize = 5;

/// A row as stored, before kind validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// The row's key. Zero when the stored key could not be parsed.
    pub hash: Hash,
    /// The raw kind byte; may be outside the persistable set.
    pub kind_code: u8,
    /// Ledger index the object first appeared in.
    pub ledger_index: u32,
    /// The payload bytes.
    pub payload: Vec<u8>,
}

/// A durable key-value engine holding hashed objects.
///
/// Implementations must treat duplicate keys as success (`put` is
/// idempotent) and make `put_many` atomic with respect to crash where the
/// engine supports it. After [`Backend::close`], every call fails with
/// [`StoreError::BackendClosed`](crate::error::StoreError::BackendClosed).
pub trait Backend: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &'static str;

    /// Persists one object. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an engine error on I/O or transaction failure.
    fn put(&self, object: &Object) -> Result<()>;

    /// Persists a batch in one engine transaction.
    ///
    /// # Errors
    ///
    /// Returns an engine error; on failure none of the batch is durable.
    fn put_many(&self, batch: &[Arc<Object>]) -> Result<()>;

    /// Reads the raw record for `hash`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an engine error on I/O failure.
    fn get(&self, hash: &Hash) -> Result<Option<RawRecord>>;

    /// Visits every row in the store. Used by import.
    ///
    /// # Errors
    ///
    /// Returns an engine error on I/O failure.
    fn scan(&self, visit: &mut dyn FnMut(RawRecord)) -> Result<()>;

    /// Shuts the backend down. In-flight and later calls fail.
    fn close(&self);
}

/// Opens a backend of the given kind at `path`.
///
/// # Errors
///
/// Returns an engine error if the database cannot be opened or created.
pub fn open(kind: BackendKind, path: &Path) -> Result<Arc<dyn Backend>> {
    Ok(match kind {
        BackendKind::Ordered => Arc::new(OrderedBackend::open(path)?),
        BackendKind::Relational => Arc::new(RelationalBackend::open(path)?),
    })
}

/// Packs an object into the ordered-engine value layout.
pub fn encode_value(object: &Object) -> Vec<u8> {
    let payload = object.payload();
    let mut value = Vec::with_capacity(VALUE_HEADER_LEN + payload.len());
    value.push(object.kind().code());
    value.extend_from_slice(&object.ledger_index().to_be_bytes());
    value.extend_from_slice(payload);
    value
}

/// Unpacks the ordered-engine value layout. Returns `None` when the value is
/// shorter than its fixed header.
pub fn decode_value(value: &[u8]) -> Option<(u8, u32, Vec<u8>)> {
    if value.len() < VALUE_HEADER_LEN {
        return None;
    }
    let kind_code = value[0];
    let mut index_bytes = [0u8; 4];
    index_bytes.copy_from_slice(&value[1..VALUE_HEADER_LEN]);
    let ledger_index = u32::from_be_bytes(index_bytes);
    Some((kind_code, ledger_index, value[VALUE_HEADER_LEN..].to_vec()))
}
