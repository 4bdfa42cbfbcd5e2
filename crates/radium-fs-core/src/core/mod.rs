// radium-fs-core/src/core/mod.rs
// ============================================================================
// Module: Radium-FS Core Types
// Description: Canonical serializer, identity hashing, identifiers, the
//              Kind recipe type, and the on-disk Manifest schema.
// Purpose: Provide the pure, storage-agnostic data model every runtime
//          module builds on.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Core types are free of any Adapter or async dependency: [`canon`] and
//! [`hashing`] are pure functions over `serde_json::Value`, [`identifiers`]
//! and [`manifest`] are plain serializable data, and [`kind::Kind`] only
//! reaches into `runtime` for the context types its closures are handed.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod canon;
pub mod hashing;
pub mod identifiers;
pub mod kind;
pub mod manifest;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use canon::CanonicalNumber;
pub use canon::CanonicalValue;
pub use canon::canonical_json_string;
pub use canon::to_canonical;
pub use hashing::data_id;
pub use hashing::hash_bytes;
pub use identifiers::DATA_ID_HEX_LEN;
pub use identifiers::DataId;
pub use identifiers::InvalidDataId;
pub use identifiers::KindName;
pub use identifiers::Scope;
pub use kind::BoxFuture;
pub use kind::CommandOutcome;
pub use kind::ExportsOutcome;
pub use kind::InitOutcome;
pub use kind::Kind;
pub use manifest::CommandRecord;
pub use manifest::CommandResult;
pub use manifest::DEFAULT_EXPORT_KEY;
pub use manifest::DependencyRecord;
pub use manifest::MANIFEST_VERSION;
pub use manifest::Manifest;
pub use manifest::Origin;
