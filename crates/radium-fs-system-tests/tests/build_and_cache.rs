// system-tests/tests/build_and_cache.rs
// ============================================================================
// Module: Build-And-Cache Scenario
// Description: A simple ensure() builds a space, and a second ensure() for
//              the same (kind, input) serves it from cache.
// Purpose: Exercise the happy path of §4.5.1 across both Adapters.
// Dependencies: radium-fs-system-tests
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "test fixtures use explicit asserts and unwraps for clarity."
)]

use radium_fs_core::EnsureOptions;
use radium_fs_system_tests::GreetingInput;
use radium_fs_system_tests::greeting_kind;
use radium_fs_system_tests::with_every_adapter;

#[tokio::test]
async fn simple_build_then_cache_hit() {
    with_every_adapter(|store, _adapter| async move {
        let kind = greeting_kind();
        let input = GreetingInput { name: "Ada".to_string(), note: String::new() };

        let first = store.ensure(&kind, input.clone(), EnsureOptions::default()).await.expect("first ensure");
        let contents = store.find(&first.origin().clone()).await.expect("find").expect("present");
        assert_eq!(contents.data_id(), first.data_id());

        let second = store.ensure(&kind, input, EnsureOptions::default()).await.expect("second ensure");
        assert_eq!(second.data_id(), first.data_id());
        assert_eq!(second.manifest().created_at, first.manifest().created_at);
    })
    .await;
}
