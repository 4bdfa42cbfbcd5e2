// system-tests/tests/command_history.rs
// ============================================================================
// Module: Command-Appends-History Scenario
// Description: Each successful send() appends one CommandRecord to the
//              manifest and persists it to disk.
// Purpose: Exercise §4.5.3 end to end across both Adapters.
// Dependencies: radium-fs-system-tests
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "test fixtures use explicit asserts and unwraps for clarity."
)]

use radium_fs_core::Adapter;
use radium_fs_core::EnsureOptions;
use radium_fs_system_tests::GreetingInput;
use radium_fs_system_tests::greeting_kind;
use radium_fs_system_tests::with_every_adapter;
use serde_json::json;

#[tokio::test]
async fn send_appends_command_history_and_persists() {
    with_every_adapter(|store, adapter| async move {
        let kind = greeting_kind();
        let mut space = store
            .ensure(&kind, GreetingInput { name: "Ada".to_string(), note: String::new() }, EnsureOptions::default())
            .await
            .expect("ensure");
        assert!(space.can_send());
        assert!(space.manifest().commands.is_empty());

        space.send(json!({"name": "Grace"})).await.expect("first send");
        assert_eq!(space.manifest().commands.len(), 1);
        assert_eq!(space.manifest().commands[0].command, json!({"name": "Grace"}));

        space.send(json!({"name": "Edsger"})).await.expect("second send");
        assert_eq!(space.manifest().commands.len(), 2);

        let contents = adapter.read_file(&space.content_dir().join("greeting.txt")).await.expect("read greeting");
        assert_eq!(contents, b"hi Edsger");

        let reloaded = store.find(space.origin()).await.expect("find").expect("space still present");
        assert_eq!(reloaded.manifest().commands.len(), 2, "command history is persisted to the manifest on disk");
        assert!(!reloaded.can_send(), "find() never reconstructs send capability");
    })
    .await;
}
