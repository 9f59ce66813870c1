//! Core types for the hashvault object store.
//!
//! This crate provides the foundational types shared by the store and its
//! consumers:
//! - [`Hash`] and the [`sha512_half`] digest function
//! - [`ObjectKind`] and the immutable [`Object`] record
//! - [`StoreConfig`] tuning knobs
//! - Error types using snafu

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hash;
pub mod object;

// Re-export commonly used types at crate root
pub use config::{BackendKind, StoreConfig};
pub use error::TypeError;
pub use hash::{sha512_half, Hash, HASH_LEN};
pub use object::{Object, ObjectKind};
