// system-tests/tests/dependency_chain.rs
// ============================================================================
// Module: Dependency-Chain Scenario
// Description: A parent Kind mounts a leaf Kind via dep(); forcing the
//              parent to rebuild still serves the leaf from cache, because
//              the nested ensure() inside dep() does its own identity check.
// Purpose: Exercise symlink-based mounting and partial-rebuild behavior
//          (§4.5.1 step 9b, §4.5.2 dep()).
// Dependencies: radium-fs-system-tests
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "test fixtures use explicit asserts and unwraps for clarity."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use radium_fs_core::Adapter;
use radium_fs_core::DepOptions;
use radium_fs_core::EnsureOptions;
use radium_fs_core::InitOutcome;
use radium_fs_core::Kind;
use radium_fs_system_tests::GreetingInput;
use radium_fs_system_tests::with_every_adapter;

fn counting_leaf_kind(builds: Arc<AtomicUsize>) -> Kind<GreetingInput> {
    Kind::new("dependency-chain-leaf", move |ctx, input: GreetingInput| {
        let builds = builds.clone();
        async move {
            builds.fetch_add(1, Ordering::SeqCst);
            ctx.write_file("greeting.txt", format!("hello {}", input.name)).await.map_err(|err| Box::new(err) as _)?;
            Ok(InitOutcome::default())
        }
    })
    .expect("valid kind")
}

fn parent_kind(leaf: Kind<GreetingInput>) -> Kind<GreetingInput> {
    Kind::new("dependency-chain-parent", move |ctx, input: GreetingInput| {
        let leaf = leaf.clone();
        async move {
            ctx.dep("leaf", &leaf, input, DepOptions::default()).await.map_err(|err| Box::new(err) as _)?;
            ctx.write_file("marker.txt", "parent built").await.map_err(|err| Box::new(err) as _)?;
            Ok(InitOutcome::default())
        }
    })
    .expect("valid kind")
}

#[tokio::test]
async fn dep_mounts_and_reuses_leaf_cache() {
    with_every_adapter(|store, adapter| async move {
        let builds = Arc::new(AtomicUsize::new(0));
        let leaf = counting_leaf_kind(builds.clone());
        let parent = parent_kind(leaf.clone());
        let input = GreetingInput { name: "Ada".to_string(), note: String::new() };

        let first_parent = store.ensure(&parent, input.clone(), EnsureOptions::default()).await.expect("build parent");
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(first_parent.manifest().dependencies.len(), 1);

        let dependency_record = &first_parent.manifest().dependencies[0];
        assert_eq!(dependency_record.mount_path, "leaf");
        assert_eq!(dependency_record.origin.kind.as_str(), leaf.name().as_str());

        let linked_path = first_parent.content_dir().join("leaf").join("greeting.txt");
        let linked_contents = adapter.read_file(&linked_path).await.expect("read through dep mount");
        assert_eq!(linked_contents, b"hello Ada");

        let rebuilt_parent = store
            .ensure(&parent, input, EnsureOptions { cache: false, ..EnsureOptions::default() })
            .await
            .expect("force parent rebuild");
        assert_eq!(rebuilt_parent.data_id(), first_parent.data_id());
        assert_eq!(builds.load(Ordering::SeqCst), 1, "leaf must not rebuild when dep()'s own cache check hits");
    })
    .await;
}
