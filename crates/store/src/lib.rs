//! hashvault-store: a content-addressed hashed-object store.
//!
//! The store sits between in-memory consumers and a durable key-value
//! backend. Given a typed payload and a ledger index it verifies the
//! caller's asserted digest, admits the object to a cache shared across
//! readers, persists it exactly once, and serves later lookups by hash from
//! cache, a negative-hit cache, or the backend, in that order.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             HashedObjectStore                │
//! │   (store, retrieve, tune, sweep, import)    │
//! └───────┬──────────────┬──────────────┬───────┘
//!         │              │              │
//! ┌───────▼──────┐ ┌─────▼───────┐ ┌────▼───────┐
//! │ TaggedCache  │ │ Negative    │ │ Write      │
//! │ (strong+weak,│ │ Cache       │ │ Batcher    │
//! │  16 shards)  │ │ (TTL set)   │ │ (gen+cond) │
//! └──────────────┘ └─────────────┘ └────┬───────┘
//!                                       │
//!                          ┌────────────▼────────────┐
//!                          │      Backend trait       │
//!                          │  (ordered / relational)  │
//!                          └─────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use hashvault_store::HashedObjectStore;
//! use hashvault_types::{sha512_half, ObjectKind, StoreConfig};
//!
//! let store = HashedObjectStore::open(&StoreConfig::default(), "objects.redb")?;
//!
//! let payload = b"transaction bytes".to_vec();
//! let hash = sha512_half(&payload);
//! store.store(ObjectKind::Transaction, 42, payload, hash);
//! store.wait_for_write();
//!
//! let object = store.retrieve(&hash).expect("resident");
//! assert_eq!(object.ledger_index(), 42);
//! # Ok::<(), hashvault_store::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod batcher;
pub mod cache;
pub mod error;
pub mod import;
pub mod jobs;
pub mod negative;
pub mod store;

// Re-export commonly used types
pub use backend::{Backend, OrderedBackend, RawRecord, RelationalBackend};
pub use batcher::WriteBatcher;
pub use cache::{CacheStats, TaggedCache};
pub use error::{Result, StoreError};
pub use import::import_backend;
pub use jobs::{InlineScheduler, JobKind, JobScheduler, ThreadScheduler};
pub use negative::NegativeCache;
pub use store::{HashedObjectStore, StoreStats};

// The types crate is part of the public API surface.
pub use hashvault_types as types;
