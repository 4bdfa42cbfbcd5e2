// radium-fs-core/src/core/identifiers.rs
// ============================================================================
// Module: Radium-FS Identifiers
// Description: Canonical opaque identifiers used throughout the store engine.
// Purpose: Provide strongly typed, serializable identifiers with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifier types used by the store: the name a
//! [`crate::core::kind::Kind`] registers under, and the derived content
//! address ([`DataId`]) every space is keyed by. Validation of `DataId`'s
//! hex shape happens where it is parsed from untrusted input (directory
//! listings); construction from a freshly computed digest is infallible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Kind Name
// ============================================================================

/// Name a [`crate::core::kind::Kind`] registers under.
///
/// Kind names participate in the canonical hashing input (§4.3) and in the
/// on-disk layout (`<storeRoot>/.radium-fs-data/<kindName>/...`), so they are
/// carried as an opaque newtype rather than a bare `String` to keep those two
/// call sites from being confused with arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KindName(String);

impl KindName {
    /// Creates a new kind name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the kind name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KindName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for KindName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Data Id
// ============================================================================

/// Length in hex characters of a [`DataId`] (one SHA-256 digest).
pub const DATA_ID_HEX_LEN: usize = 64;

/// Deterministic 64-hex-character content address of a space.
///
/// A `DataId` is always recomputed from `(kind, effective cache key)` via
/// [`crate::core::hashing::data_id`]; it is never itself a stored field on a
/// [`crate::core::manifest::Manifest`]. The only place an already-formed
/// `DataId` is parsed back out of untrusted text is directory-name parsing
/// during [`crate::runtime::engine::Store::list`], which goes through
/// [`DataId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(String);

/// Error returned when a candidate string is not a well-formed [`DataId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid data id: {0:?}")]
pub struct InvalidDataId(String);

impl DataId {
    /// Wraps an already-validated 64-hex-lowercase digest string.
    ///
    /// Callers that computed the digest themselves (e.g. via
    /// [`crate::core::hashing::data_id`]) know the invariant holds; this
    /// constructor does not re-validate.
    #[must_use]
    pub(crate) fn from_hex_unchecked(hex: String) -> Self {
        debug_assert!(is_valid_hex(&hex), "data id must be 64 lowercase hex chars");
        Self(hex)
    }

    /// Parses and validates a candidate `DataId` string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDataId`] when the string is not exactly
    /// [`DATA_ID_HEX_LEN`] lowercase hex characters.
    pub fn parse(candidate: impl Into<String>) -> Result<Self, InvalidDataId> {
        let candidate = candidate.into();
        if is_valid_hex(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(InvalidDataId(candidate))
        }
    }

    /// Returns the digest as a lowercase hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the shard: the first two hex characters of the digest (§4.3).
    #[must_use]
    pub fn shard(&self) -> &str {
        &self.0[.. 2]
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn is_valid_hex(candidate: &str) -> bool {
    candidate.len() == DATA_ID_HEX_LEN
        && candidate.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

// ============================================================================
// SECTION: Scope
// ============================================================================

/// Dependency scope: whether a mounted dependency is reusable store-wide or
/// private to (and destroyed with) its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Materializes under the store root; discoverable by any parent.
    Shared,
    /// Materializes under the parent's private `.radium-fs-local-deps/`
    /// subtree and is destroyed with the parent.
    Local,
}

impl Default for Scope {
    fn default() -> Self {
        Self::Shared
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn data_id_parse_rejects_wrong_length() {
        assert!(DataId::parse("abcd").is_err());
    }

    #[test]
    fn data_id_parse_rejects_uppercase() {
        let candidate = "A".repeat(DATA_ID_HEX_LEN);
        assert!(DataId::parse(candidate).is_err());
    }

    #[test]
    fn data_id_parse_accepts_valid_hex() {
        let candidate = "a1".repeat(32);
        let id = DataId::parse(candidate.clone()).expect("valid hex parses");
        assert_eq!(id.as_str(), candidate);
        assert_eq!(id.shard(), "a1");
    }

    #[test]
    fn kind_name_roundtrips_through_display() {
        let kind = KindName::from("greeting");
        assert_eq!(kind.to_string(), "greeting");
    }
}
