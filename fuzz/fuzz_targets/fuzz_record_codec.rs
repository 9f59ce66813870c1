//! Fuzz target for the backend record codec and hash parsing.
//!
//! Tests that arbitrary bytes fed to the value decoder and the hex hash
//! parser never panic, and that successfully decoded records roundtrip.

#![no_main]

use libfuzzer_sys::fuzz_target;

use hashvault_store::backend::{decode_value, encode_value};
use hashvault_types::{Hash, Object, ObjectKind};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 2;
    let payload = &data[1..];

    match selector {
        0 => try_value_roundtrip(payload),
        _ => try_hash_parse(payload),
    }
});

/// Attempt to decode arbitrary bytes as a packed record. If successful and
/// the kind byte is persistable, re-encoding must reproduce the input.
fn try_value_roundtrip(data: &[u8]) {
    if let Some((kind_code, ledger_index, payload)) = decode_value(data) {
        if let Ok(kind) = ObjectKind::try_from(kind_code) {
            let object = Object::from_payload(kind, ledger_index, payload);
            let re_encoded = encode_value(&object);
            assert_eq!(re_encoded, data, "roundtrip mismatch");
        }
    }
    // Decode failure is expected for short inputs; no panic is the invariant.
}

/// Hex parsing must never panic, and accepted inputs must roundtrip through
/// the canonical lowercase form.
fn try_hash_parse(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(hash) = Hash::from_hex(text) {
        let canonical = hash.to_hex();
        assert_eq!(Hash::from_hex(&canonical), Ok(hash), "canonical form must reparse");
        assert_eq!(canonical, text.to_ascii_lowercase(), "hex must normalize to lowercase");
    }
}
