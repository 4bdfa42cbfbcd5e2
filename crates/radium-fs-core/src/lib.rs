// radium-fs-core/src/lib.rs
// ============================================================================
// Module: Radium-FS Core Library
// Description: Public API surface for radium-fs.
// Purpose: Expose the data model, the Adapter/Locker interfaces, and the
//          runtime engine that drives the content-addressed build protocol.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! radium-fs turns a [`core::Kind`] recipe and an input value into a
//! reproducible, dependency-linked directory tree on top of a pluggable
//! [`interfaces::Adapter`]. It is backend-agnostic: the in-memory adapter and
//! locker in [`runtime`] are reference implementations used by this crate's
//! own tests, while a production caller supplies a native filesystem adapter
//! (see the sibling `radium-fs-adapter-fs` crate).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::BoxFuture;
pub use core::CanonicalNumber;
pub use core::CanonicalValue;
pub use core::CommandOutcome;
pub use core::CommandRecord;
pub use core::CommandResult;
pub use core::DATA_ID_HEX_LEN;
pub use core::DEFAULT_EXPORT_KEY;
pub use core::DataId;
pub use core::DependencyRecord;
pub use core::ExportsOutcome;
pub use core::InitOutcome;
pub use core::InvalidDataId;
pub use core::Kind;
pub use core::KindName;
pub use core::MANIFEST_VERSION;
pub use core::Manifest;
pub use core::Origin;
pub use core::Scope;
pub use core::canonical_json_string;
pub use core::data_id;
pub use core::hash_bytes;
pub use core::to_canonical;

pub use interfaces::Adapter;
pub use interfaces::AdapterError;
pub use interfaces::GlobOptions;
pub use interfaces::GrepMatch;
pub use interfaces::GrepOptions;
pub use interfaces::LockError;
pub use interfaces::LockHandle;
pub use interfaces::Locker;
pub use interfaces::RemoveOptions;
pub use interfaces::StatInfo;

pub use runtime::CancelSignal;
pub use runtime::CommandContext;
pub use runtime::CommandEventTag;
pub use runtime::ContentOps;
pub use runtime::CurrentState;
pub use runtime::DepOptions;
pub use runtime::EnsureOptions;
pub use runtime::Event;
pub use runtime::EventBus;
pub use runtime::InProcessLockHandle;
pub use runtime::InProcessLocker;
pub use runtime::InitContext;
pub use runtime::LocalOps;
pub use runtime::MAX_SYMLINK_DEPTH;
pub use runtime::MemoryAdapter;
pub use runtime::OnCachedFn;
pub use runtime::OnDoneFn;
pub use runtime::OnErrorFn;
pub use runtime::OnStartFn;
pub use runtime::ReadDirOptions;
pub use runtime::ReadFileOptions;
pub use runtime::Space;
pub use runtime::Store;
pub use runtime::StoreError;
pub use runtime::Unsubscribe;
