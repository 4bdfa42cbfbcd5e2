// radium-fs-core/src/runtime/locker.rs
// ============================================================================
// Module: Radium-FS In-Process Locker
// Description: Reference Locker serializing concurrent builds of the same
//              DataId within one process.
// Purpose: Give ensure(cache:true) its dedup guarantee (§4.3, §5) out of
//          the box, without requiring a cross-process lock backend.
// Dependencies: tokio, parking_lot, crate::{interfaces, runtime::cancel}
// ============================================================================

//! ## Overview
//! Keyed by [`crate::core::identifiers::DataId`] as text. Each key gets a
//! `tokio::sync::Mutex<()>` created lazily on first use; entries are never
//! removed, so the registry grows with the number of distinct DataIds ever
//! built in this process. This is the same tradeoff the spec accepts for
//! per-space event maps everywhere *except* here — those are purged on
//! `remove`, but an advisory lock has no correctness requirement to drop
//! its entry, and removing it under concurrent acquisition would be an
//! unforced source of bugs for a crate-internal convenience type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::OwnedMutexGuard;

use crate::interfaces::LockError;
use crate::interfaces::LockHandle;
use crate::interfaces::Locker;
use crate::runtime::cancel::CancelSignal;

// ============================================================================
// SECTION: InProcessLocker
// ============================================================================

/// In-process advisory [`Locker`] keyed by an opaque string.
#[derive(Default)]
pub struct InProcessLocker {
    entries: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InProcessLocker {
    /// Creates an empty locker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock();
        entries.entry(key.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

/// Held lock returned by [`InProcessLocker::acquire`]; releases on drop or
/// on an explicit `release()` call.
pub struct InProcessLockHandle {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockHandle for InProcessLockHandle {
    async fn release(self: Box<Self>) {}
}

#[async_trait]
impl Locker for InProcessLocker {
    async fn acquire(&self, key: &str, signal: &CancelSignal) -> Result<Box<dyn LockHandle>, LockError> {
        if signal.is_aborted() {
            return Err(LockError::Aborted);
        }
        let mutex = self.entry(key);
        let guard = mutex.lock_owned().await;
        if signal.is_aborted() {
            return Err(LockError::Aborted);
        }
        Ok(Box::new(InProcessLockHandle { _guard: guard }))
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

    #[tokio::test]
    async fn second_acquire_waits_for_first_release() {
        let locker = Arc::new(InProcessLocker::new());
        let signal = CancelSignal::new();
        let first = locker.acquire("k", &signal).await.expect("first acquire");

        let waiter_locker = locker.clone();
        let waiter_signal = signal.clone();
        let waiter = tokio::spawn(async move { waiter_locker.acquire("k", &waiter_signal).await.is_ok() });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.release().await;
        assert!(waiter.await.expect("waiter task"));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locker = InProcessLocker::new();
        let signal = CancelSignal::new();
        let a = locker.acquire("a", &signal).await.expect("acquire a");
        let b = locker.acquire("b", &signal).await.expect("acquire b");
        a.release().await;
        b.release().await;
    }
}
