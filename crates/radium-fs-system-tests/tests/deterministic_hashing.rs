// system-tests/tests/deterministic_hashing.rs
// ============================================================================
// Module: Deterministic-Hashing Scenario
// Description: Two logically-identical inputs built with different
//              in-memory field orders produce the same DataId.
// Purpose: Exercise the canonical serializer's key-order independence
//          (§4.1) through the full ensure() path.
// Dependencies: radium-fs-system-tests
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "test fixtures use explicit asserts and unwraps for clarity."
)]

use std::collections::HashMap;

use radium_fs_core::EnsureOptions;
use radium_fs_system_tests::ManifestEchoInput;
use radium_fs_system_tests::manifest_echo_kind;
use radium_fs_system_tests::with_every_adapter;

#[tokio::test]
async fn key_order_does_not_change_identity() {
    with_every_adapter(|store, _adapter| async move {
        let kind = manifest_echo_kind();

        let mut tags_forward = HashMap::new();
        tags_forward.insert("alpha".to_string(), "x".to_string());
        tags_forward.insert("beta".to_string(), "y".to_string());
        tags_forward.insert("gamma".to_string(), "z".to_string());

        let mut tags_reverse = HashMap::new();
        tags_reverse.insert("gamma".to_string(), "z".to_string());
        tags_reverse.insert("beta".to_string(), "y".to_string());
        tags_reverse.insert("alpha".to_string(), "x".to_string());

        let a = ManifestEchoInput { name: "same".to_string(), tags: tags_forward };
        let b = ManifestEchoInput { name: "same".to_string(), tags: tags_reverse };

        let space_a = store.ensure(&kind, a, EnsureOptions::default()).await.expect("ensure a");
        let space_b = store.ensure(&kind, b, EnsureOptions::default()).await.expect("ensure b");

        assert_eq!(space_a.data_id(), space_b.data_id());
        assert_eq!(space_a.content_dir(), space_b.content_dir());
    })
    .await;
}
