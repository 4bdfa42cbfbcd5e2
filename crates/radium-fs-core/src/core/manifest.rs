// radium-fs-core/src/core/manifest.rs
// ============================================================================
// Module: Radium-FS Manifest
// Description: Serialized authoritative description of one materialized space.
// Purpose: Persist origin, exports, dependencies, command history, and metadata.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`Manifest`] is the on-disk sidecar at
//! `<dataDir>/.radium-fs-manifest.json` (§6). A space directory exists if
//! and only if its manifest file exists (§3 Invariants); nothing else in
//! this crate reads or writes `.radium-fs-manifest.json` outside of
//! [`crate::runtime::engine`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::KindName;
use crate::core::identifiers::Scope;

/// Fixed manifest schema version tag (§3). Present for forward-compatible
/// parsing; this crate implements no migration beyond reading it.
pub const MANIFEST_VERSION: u32 = 1;

/// Default export key every [`Manifest::exports`] map must contain.
pub const DEFAULT_EXPORT_KEY: &str = ".";

// ============================================================================
// SECTION: Origin
// ============================================================================

/// What produced a space: the triple a caller uses to relocate it via
/// [`crate::runtime::engine::Store::find`]/[`crate::runtime::engine::Store::has`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    /// Name of the [`crate::core::kind::Kind`] that produced the space.
    pub kind: KindName,
    /// Raw input the caller passed to `ensure`.
    pub input: Value,
    /// Derived cache key, present only when the Kind defines `cacheKey`.
    ///
    /// This is the *derived object*, not the function — recomputing it from
    /// `input` alone is not attempted; it is carried so `find`/`has` can
    /// reconstruct the exact hashing input without re-invoking user code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<Value>,
}

impl Origin {
    /// Returns the value the `DataId` was actually derived from:
    /// `cacheKey ?? input`.
    #[must_use]
    pub fn effective_input(&self) -> &Value {
        self.cache_key.as_ref().unwrap_or(&self.input)
    }
}

// ============================================================================
// SECTION: Dependency Record
// ============================================================================

/// One entry in [`Manifest::dependencies`], recorded in `dep()` call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    /// Path relative to the parent's content directory; may contain `/`.
    pub mount_path: String,
    /// Origin of the mounted dependency.
    pub origin: Origin,
    /// Whether the dependency is store-shared or parent-local.
    pub scope: Scope,
    /// Export selector used to resolve the symlink target. `None` means the
    /// default export (equivalent to `"."`); `Some("*")` bypasses the
    /// exports map entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
}

// ============================================================================
// SECTION: Command Record
// ============================================================================

/// One entry in [`Manifest::commands`], appended on each successful `send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    /// The command value passed to `send`.
    pub command: Value,
    /// ISO-8601 timestamp of execution.
    pub executed_at: String,
    /// Resolved result, when the handler returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
}

/// Resolved exports/metadata produced by a successful command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Export map after the command, relative to the content directory.
    pub exports: BTreeMap<String, String>,
    /// Metadata map after the command.
    pub metadata: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// The serialized authoritative description of one materialized space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Fixed schema version tag, always [`MANIFEST_VERSION`].
    pub version: u32,
    /// What produced this space.
    pub origin: Origin,
    /// Export name -> path relative to the content directory. Always
    /// contains at least [`DEFAULT_EXPORT_KEY`] (§3 Invariants).
    pub exports: BTreeMap<String, String>,
    /// Ordered dependency-mount history.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRecord>,
    /// Ordered command-execution history.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandRecord>,
    /// Opaque metadata set by `onInit`/`onCommand`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 last-update timestamp.
    pub updated_at: String,
}

impl Manifest {
    /// Returns the absolute-within-content-dir relative path for an export
    /// name, or `None` if the export is not present.
    #[must_use]
    pub fn export_path(&self, export: &str) -> Option<&str> {
        self.exports.get(export).map(String::as_str)
    }

    /// Returns the manifest's export names, for `ExportNotFoundError`
    /// diagnostics (§4.5.2, §7).
    #[must_use]
    pub fn export_names(&self) -> Vec<String> {
        self.exports.keys().cloned().collect()
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

    use serde_json::json;

    use super::*;

    #[test]
    fn manifest_round_trips_through_json() {
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            origin: Origin {
                kind: KindName::from("greeting"),
                input: json!({"name": "World"}),
                cache_key: None,
            },
            exports: BTreeMap::from([(DEFAULT_EXPORT_KEY.to_string(), ".".to_string())]),
            dependencies: Vec::new(),
            commands: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let text = serde_json::to_string(&manifest).expect("serializes");
        assert!(!text.contains("\"dependencies\""));
        assert!(!text.contains("\"commands\""));
        assert!(!text.contains("\"cacheKey\""));
        assert!(text.contains("\"createdAt\""));
        let parsed: Manifest = serde_json::from_str(&text).expect("parses");
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn effective_input_prefers_cache_key() {
        let origin = Origin {
            kind: KindName::from("k"),
            input: json!({"a": 1, "debug": true}),
            cache_key: Some(json!({"a": 1})),
        };
        assert_eq!(origin.effective_input(), &json!({"a": 1}));
    }
}
