// system-tests/tests/cache_key_identity.rs
// ============================================================================
// Module: CacheKey-Reduces-Identity Scenario
// Description: Two inputs differing only in a field excluded by the Kind's
//              cacheKey projection share one DataId and one space.
// Purpose: Exercise `Kind::with_cache_key` end to end (§3, §4.3).
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
async fn cache_key_narrows_identity_to_the_projected_subset() {
    with_every_adapter(|store, _adapter| async move {
        let kind = greeting_kind();

        let first = store
            .ensure(&kind, GreetingInput { name: "Ada".to_string(), note: "first build".to_string() }, EnsureOptions::default())
            .await
            .expect("ensure first");
        let second = store
            .ensure(&kind, GreetingInput { name: "Ada".to_string(), note: "entirely different note".to_string() }, EnsureOptions::default())
            .await
            .expect("ensure second");

        assert_eq!(first.data_id(), second.data_id());
        assert_eq!(first.content_dir(), second.content_dir());
        assert_ne!(first.origin().input, second.origin().input, "raw inputs differ in `note`");
        assert_eq!(first.origin().cache_key, second.origin().cache_key, "cacheKey projects `note` away, so it matches");
        assert_ne!(first.origin().input, first.origin().cache_key.clone().unwrap(), "cacheKey is a narrower projection than the raw input");

        let differently_named = store
            .ensure(&kind, GreetingInput { name: "Grace".to_string(), note: "first build".to_string() }, EnsureOptions::default())
            .await
            .expect("ensure differently named");
        assert_ne!(first.data_id(), differently_named.data_id());
    })
    .await;
}
