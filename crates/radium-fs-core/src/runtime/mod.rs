// radium-fs-core/src/runtime/mod.rs
// ============================================================================
// Module: Radium-FS Runtime
// Description: The async engine that turns Kind recipes into on-disk
//              Spaces: build context types, the event bus, the reference
//              Adapter and Locker, and the Store entry point.
// Purpose: House everything that touches an Adapter, a Locker, or async
//          execution, as distinct from the pure data model in `core`.
// Dependencies: tokio, async-trait, parking_lot, rand, time, tracing
// ============================================================================

//! ## Overview
//! [`engine::Store`] is the public entry point: it owns an [`crate::interfaces::Adapter`],
//! an optional [`crate::interfaces::Locker`], and an [`event::EventBus`], and drives the
//! build protocol in [`engine::ensure_with`] and [`engine::send_command`]. The
//! context types a `Kind`'s closures receive ([`build_api::InitContext`],
//! [`build_api::CommandContext`]) are constructed here and handed across the
//! `core::kind` boundary. [`memory_adapter::MemoryAdapter`] and
//! [`locker::InProcessLocker`] are the in-process reference implementations of
//! the two pluggable traits.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod build_api;
pub mod cancel;
pub mod engine;
pub mod error;
pub mod event;
pub mod layout;
pub mod locker;
pub mod memory_adapter;
pub mod space;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use build_api::CommandContext;
pub use build_api::ContentOps;
pub use build_api::CurrentState;
pub use build_api::DepOptions;
pub use build_api::InitContext;
pub use build_api::LocalOps;
pub use build_api::ReadDirOptions;
pub use build_api::ReadFileOptions;
pub use cancel::CancelSignal;
pub use engine::EnsureOptions;
pub use engine::OnCachedFn;
pub use engine::OnDoneFn;
pub use engine::OnErrorFn;
pub use engine::OnStartFn;
pub use engine::Store;
pub use error::BoxError;
pub use error::StoreError;
pub use event::CommandEventTag;
pub use event::Event;
pub use event::EventBus;
pub use event::Unsubscribe;
pub use locker::InProcessLockHandle;
pub use locker::InProcessLocker;
pub use memory_adapter::MAX_SYMLINK_DEPTH;
pub use memory_adapter::MemoryAdapter;
pub use space::Space;
