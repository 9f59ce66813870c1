//! Cryptographic hashing for hashvault.
//!
//! Objects are identified by the upper 256 bits of their payload's SHA-512
//! digest. This module provides:
//! - The opaque [`Hash`] identifier with hex I/O and byte ordering
//! - The [`sha512_half`] digest function
//! - The zero-hash sentinel meaning "invalid/absent"

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha512};

use crate::error::{Result, TypeError};

/// Length of a hash in bytes.
pub const HASH_LEN: usize = 32;

/// 256-bit object identifier.
///
/// Equality and ordering are over the raw bytes. The textual form is
/// 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_LEN]);

impl Hash {
    /// The zero hash, used as an "invalid/absent" sentinel.
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    /// Wraps raw bytes as a hash.
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Returns `true` for the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// Encodes as 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decodes from 64 hex characters (either case).
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidHashLength`] or [`TypeError::InvalidHex`]
    /// when the input is not a 64-char hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != HASH_LEN * 2 {
            return Err(TypeError::InvalidHashLength { len: s.len() });
        }
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| TypeError::InvalidHex { input: s.to_string() })?;
        Ok(Hash(bytes))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Hash::from_hex(s)
    }
}

/// Computes the digest of a payload: the upper half of its SHA-512 hash.
///
/// Truncating SHA-512 to 256 bits is both faster than SHA-256 on 64-bit
/// hardware and immune to length-extension.
pub fn sha512_half(data: &[u8]) -> Hash {
    let digest = Sha512::digest(data);
    let mut bytes = [0u8; HASH_LEN];
    bytes.copy_from_slice(&digest[..HASH_LEN]);
    Hash(bytes)
}
