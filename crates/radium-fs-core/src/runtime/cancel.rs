// radium-fs-core/src/runtime/cancel.rs
// ============================================================================
// Module: Radium-FS Cancel Signal
// Description: Minimal cooperative cancellation token passed into ensure/dep.
// Purpose: Let a caller abort a pending build without the engine polling
//          inside adapter I/O (§5 Cancellation).
// Dependencies: std::sync::atomic
// ============================================================================

//! A [`CancelSignal`] is checked exactly once by the engine, before lock
//! acquisition and before entering the build path (§4.5.1 step 3). It is
//! then handed to `onInit`/`onCommand` via the build context so user code
//! may poll it; the engine itself never polls inside I/O.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// A cheaply cloneable, cooperative abort flag.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Fires the signal. Idempotent.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether the signal has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
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
    fn starts_unfired() {
        assert!(!CancelSignal::new().is_aborted());
    }

    #[test]
    fn abort_is_visible_through_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.abort();
        assert!(signal.is_aborted());
    }
}
