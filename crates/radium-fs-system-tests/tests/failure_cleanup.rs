// system-tests/tests/failure_cleanup.rs
// ============================================================================
// Module: Failure-Cleans-Up Scenario
// Description: A Kind whose onInit always fails leaves no manifest and no
//              data directory behind; ensure() surfaces the user's error.
// Purpose: Exercise §4.5.1's failure-cleanup path and §7's UserInitError
//          propagation across both Adapters.
// Dependencies: radium-fs-system-tests
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "test fixtures use explicit asserts and unwraps for clarity."
)]

use radium_fs_core::EnsureOptions;
use radium_fs_core::Origin;
use radium_fs_core::StoreError;
use radium_fs_system_tests::GreetingInput;
use radium_fs_system_tests::failing_kind;
use radium_fs_system_tests::with_every_adapter;

#[tokio::test]
async fn failed_init_leaves_no_space_behind() {
    with_every_adapter(|store, _adapter| async move {
        let kind = failing_kind();
        let input = GreetingInput { name: "Ada".to_string(), note: String::new() };
        let origin = Origin { kind: kind.name().clone(), input: serde_json::to_value(&input).expect("serializable input"), cache_key: None };

        let result = store.ensure(&kind, input.clone(), EnsureOptions::default()).await;
        let err = result.expect_err("onInit always fails");
        assert!(matches!(err, StoreError::UserInit(_)), "failure surfaces as UserInitError, unchanged");
        assert!(!store.has(&origin).await.expect("has"), "a failed build leaves no manifest behind");

        // Retrying the same identity hits the same clean slate, not a half-built space.
        let retried = store.ensure(&kind, input, EnsureOptions::default()).await;
        assert!(retried.is_err());
        assert!(!store.has(&origin).await.expect("has"), "retrying a failing onInit still leaves nothing behind");
    })
    .await;
}
