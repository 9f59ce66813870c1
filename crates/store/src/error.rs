//! Error types for the hashvault store.

use std::io;

use hashvault_types::Hash;
use snafu::Snafu;

/// Result type alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors that can occur in the store and its backends.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// I/O error from the underlying storage.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Failed to open a backend database.
    #[snafu(display("Failed to open backend at {path}: {source}"))]
    Open {
        /// Path that failed to open.
        path: String,
        /// The underlying engine error.
        source: redb::DatabaseError,
    },

    /// SQLite error from the relational backend.
    #[snafu(display("SQLite error: {source}"))]
    Sql {
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Storage error from the ordered backend.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying engine error.
        source: redb::StorageError,
    },

    /// Table error from the ordered backend.
    #[snafu(display("Table error: {source}"))]
    Table {
        /// The underlying engine error.
        source: redb::TableError,
    },

    /// Transaction error from the ordered backend.
    #[snafu(display("Transaction error: {source}"))]
    Transaction {
        /// The underlying engine error.
        source: redb::TransactionError,
    },

    /// Commit error from the ordered backend.
    #[snafu(display("Commit error: {source}"))]
    Commit {
        /// The underlying engine error.
        source: redb::CommitError,
    },

    /// A backend row failed structural validation.
    #[snafu(display("Corrupt record for {hash}: {reason}"))]
    CorruptRecord {
        /// Hash of the corrupt row.
        hash: Hash,
        /// What was wrong with it.
        reason: String,
    },

    /// A payload's digest does not match its asserted hash.
    #[snafu(display("Digest mismatch for {hash}"))]
    DigestMismatch {
        /// The asserted hash.
        hash: Hash,
    },

    /// The backend has been closed; all further calls fail.
    #[snafu(display("Backend is closed"))]
    BackendClosed,
}

impl From<io::Error> for StoreError {
    fn from(source: io::Error) -> Self {
        StoreError::Io { source }
    }
}
