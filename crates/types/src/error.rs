//! Error types for hashvault core types.

use snafu::Snafu;

/// Result type alias for type-level operations.
pub type Result<T, E = TypeError> = std::result::Result<T, E>;

/// Errors produced when decoding hashes or object kinds.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum TypeError {
    /// Hex string has the wrong length for a 256-bit hash.
    #[snafu(display("Invalid hash length: {len} hex chars (expected 64)"))]
    InvalidHashLength {
        /// Number of hex characters supplied.
        len: usize,
    },

    /// Hex string contains non-hex characters.
    #[snafu(display("Invalid hex in hash: {input}"))]
    InvalidHex {
        /// The offending input.
        input: String,
    },

    /// Kind byte is not one of the persistable codes.
    #[snafu(display("Invalid object kind code: {code:#04x}"))]
    InvalidKind {
        /// The unrecognized code byte.
        code: u8,
    },
}
