// radium-fs-core/src/runtime/error.rs
// ============================================================================
// Module: Radium-FS Store Error
// Description: The single error type every Store engine operation returns.
// Purpose: Collapse §7's tagged error kinds into one thiserror enum that
//          propagates Adapter/Locker/user errors unchanged.
// Dependencies: thiserror, crate::interfaces
// ============================================================================

//! ## Overview
//! One enum for the whole engine, mirroring §7. User errors (`onInit`,
//! `onCommand`) are carried as an opaque boxed error rather than downcast or
//! reinterpreted, matching "propagates the original error object unchanged".

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::AdapterError;
use crate::interfaces::LockError;

/// Type-erased error surface for user-supplied `onInit`/`onCommand` closures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type every [`crate::runtime::engine::Store`] operation returns.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A Kind was declared without a non-empty name or without an
    /// initializer.
    #[error("invalid kind: {0}")]
    Validation(String),

    /// The operation was cancelled via its `signal`.
    #[error("operation aborted")]
    Aborted,

    /// `dep` asked for a named export the dependency does not expose.
    #[error("export {requested:?} not found; available exports: {available:?}")]
    ExportNotFound {
        /// The export name that was requested.
        requested: String,
        /// The dependency's actually available export names.
        available: Vec<String>,
    },

    /// The temp-to-final rename failed and no winning sibling was observed
    /// at the destination.
    #[error("failed to finalize build: {0}")]
    FinalizeFailed(String),

    /// `onInit` raised an error; the original error is carried unchanged.
    #[error("onInit failed: {0}")]
    UserInit(#[source] BoxError),

    /// `onCommand` raised an error; the original error is carried unchanged.
    #[error("onCommand failed: {0}")]
    UserCommand(#[source] BoxError),

    /// An error bubbled up from the [`crate::interfaces::Adapter`].
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// An error bubbled up from the configured [`crate::interfaces::Locker`].
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
}
