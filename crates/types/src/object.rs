//! The hashed-object record and its kind tags.

use std::fmt;

use crate::error::{Result, TypeError};
use crate::hash::{sha512_half, Hash};

/// Role tag for a stored object, encoded as a single byte on disk.
///
/// `Unknown` exists so corrupted reads have a name; a correct writer never
/// persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectKind {
    /// A closed ledger header.
    Ledger = b'L',
    /// A transaction blob.
    Transaction = b'T',
    /// A node of the account-state tree.
    AccountNode = b'A',
    /// A node of the transaction tree.
    TransactionNode = b'N',
    /// Unrecognized; never written by a correct caller.
    Unknown = b'U',
}

impl ObjectKind {
    /// The on-disk code byte.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// The code as a one-character string, for text-keyed backends.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ledger => "L",
            Self::Transaction => "T",
            Self::AccountNode => "A",
            Self::TransactionNode => "N",
            Self::Unknown => "U",
        }
    }
}

impl TryFrom<u8> for ObjectKind {
    type Error = TypeError;

    /// Decodes a persistable code byte.
    ///
    /// Rejects anything outside `{L, T, A, N}`, including `U`, which is
    /// only ever a corruption signal on read.
    fn try_from(code: u8) -> Result<Self> {
        match code {
            b'L' => Ok(Self::Ledger),
            b'T' => Ok(Self::Transaction),
            b'A' => Ok(Self::AccountNode),
            b'N' => Ok(Self::TransactionNode),
            _ => Err(TypeError::InvalidKind { code }),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable hashed object.
///
/// Invariant: `hash == sha512_half(payload)`. Constructed only on the store
/// path (where the caller asserts the hash) or on the retrieve path (where
/// the backend row carried it); never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    kind: ObjectKind,
    ledger_index: u32,
    payload: Vec<u8>,
    hash: Hash,
}

impl Object {
    /// Builds an object from its parts. The hash is taken on trust; use
    /// [`Object::verify`] when the parts came from an untrusted source.
    pub fn new(kind: ObjectKind, ledger_index: u32, payload: Vec<u8>, hash: Hash) -> Self {
        Self { kind, ledger_index, payload, hash }
    }

    /// Builds an object and computes its hash from the payload.
    pub fn from_payload(kind: ObjectKind, ledger_index: u32, payload: Vec<u8>) -> Self {
        let hash = sha512_half(&payload);
        Self { kind, ledger_index, payload, hash }
    }

    /// The object's role tag.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Index of the ledger this object first appeared in.
    pub fn ledger_index(&self) -> u32 {
        self.ledger_index
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The object's content hash.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Recomputes the payload digest and compares it to the stored hash.
    pub fn verify(&self) -> bool {
        sha512_half(&self.payload) == self.hash
    }
}
