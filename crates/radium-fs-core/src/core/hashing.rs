// radium-fs-core/src/core/hashing.rs
// ============================================================================
// Module: Radium-FS Identity Hashing
// Description: DataId derivation over canonicalized kind + cache key input.
// Purpose: Provide the single deterministic identity computation the whole
//          store keys off of.
// Dependencies: sha2, crate::core::canon
// ============================================================================

//! ## Overview
//! `data_id` is the one place §4.3's identity rule is implemented:
//! `SHA-256(kindName || 0x00 || canonical(cacheKey(input) ?? input ?? {}))`.
//! Everything else in the engine — shard, data directory, temp directory —
//! is pure path arithmetic over the `DataId` this module produces
//! ([`crate::runtime::layout`]).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

use crate::core::canon::to_canonical;
use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;

// ============================================================================
// SECTION: Identity Derivation
// ============================================================================

/// Computes the `DataId` for a `(kind, effective cache key)` pair.
///
/// `effective_input` is `cacheKey(input) ?? input`, already resolved by the
/// caller (see [`crate::core::kind::Kind::effective_cache_key`]); `None`
/// here stands for the spec's "input is absent/null", which hashes
/// identically to an empty object (§4.3).
#[must_use]
pub fn data_id(kind: &KindName, effective_input: Option<&Value>) -> DataId {
    let empty = Value::Object(serde_json::Map::new());
    let input = match effective_input {
        None | Some(Value::Null) => &empty,
        Some(value) => value,
    };
    let canonical_json = to_canonical(input).to_json_string();

    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0x00u8]);
    hasher.update(canonical_json.as_bytes());
    let digest = hasher.finalize();

    DataId::from_hex_unchecked(hex_encode(&digest))
}

/// Hashes raw bytes with SHA-256, returning lowercase hex.
///
/// Used directly by reference [`crate::interfaces::Adapter`] implementations
/// to satisfy the `hash` operation of §4.2.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn data_id_is_64_lowercase_hex_chars() {
        let id = data_id(&KindName::from("greeting"), Some(&json!({"name": "World"})));
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn data_id_is_pure_function_of_kind_and_input() {
        let kind = KindName::from("k");
        let input = json!({"a": 1, "b": 2});
        let first = data_id(&kind, Some(&input));
        let second = data_id(&kind, Some(&input));
        assert_eq!(first, second);
    }

    #[test]
    fn data_id_insensitive_to_key_insertion_order() {
        let kind = KindName::from("k");
        let a = data_id(&kind, Some(&json!({"a": 1, "b": 2})));
        let b = data_id(&kind, Some(&json!({"b": 2, "a": 1})));
        assert_eq!(a, b);
    }

    #[test]
    fn absent_null_and_empty_object_hash_identically() {
        let kind = KindName::from("k");
        let absent = data_id(&kind, None);
        let null = data_id(&kind, Some(&Value::Null));
        let empty = data_id(&kind, Some(&json!({})));
        assert_eq!(absent, null);
        assert_eq!(null, empty);
    }

    #[test]
    fn different_kind_names_produce_different_ids() {
        let input = json!({"a": 1});
        let a = data_id(&KindName::from("k1"), Some(&input));
        let b = data_id(&KindName::from("k2"), Some(&input));
        assert_ne!(a, b);
    }
}
