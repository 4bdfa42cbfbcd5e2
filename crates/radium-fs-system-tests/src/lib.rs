// radium-fs-system-tests/src/lib.rs
// ============================================================================
// Module: Radium-FS System Tests Library
// Description: Shared fixture Kinds and a two-Adapter harness for end-to-end
//              scenario tests.
// Purpose: Let each scenario in `tests/` run once against the in-memory
//          Adapter and once against the native-filesystem Adapter without
//          duplicating the setup.
// Dependencies: radium-fs-core, radium-fs-adapter-fs, tempfile, tokio
// ============================================================================

//! ## Overview
//! [`with_every_adapter`] runs an async scenario closure twice: once against
//! [`radium_fs_core::MemoryAdapter`] rooted at a fixed virtual path, and once
//! against [`radium_fs_adapter_fs::FsAdapter`] rooted at a fresh
//! [`tempfile::TempDir`] that is dropped at the end of the call. Both runs
//! see the same `Store` API, so a scenario written once exercises both
//! reference backends (§8: "run against both Adapters via a shared
//! harness"). The scenario also receives the raw [`Adapter`] handle so it can
//! assert on file contents the `Space`/`Store` API itself does not expose a
//! generic reader for.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use radium_fs_adapter_fs::FsAdapter;
use radium_fs_core::Adapter;
use radium_fs_core::CommandOutcome;
use radium_fs_core::InitOutcome;
use radium_fs_core::Kind;
use radium_fs_core::MemoryAdapter;
use radium_fs_core::Store;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Runs `scenario` once per shipped Adapter, handing it a freshly rooted
/// [`Store`] and the [`Adapter`] backing it.
pub async fn with_every_adapter<F, Fut>(scenario: F)
where
    F: Fn(Store, Arc<dyn Adapter>) -> Fut,
    Fut: Future<Output = ()>,
{
    let memory_adapter = Arc::new(MemoryAdapter::new()) as Arc<dyn Adapter>;
    let memory_store = Store::new("/store", memory_adapter.clone());
    scenario(memory_store, memory_adapter).await;

    #[allow(clippy::expect_used, reason = "tempdir creation failing means the host has no writable tmp, not a scenario bug")]
    let temp_dir = tempfile::tempdir().expect("temp dir for fs-backed scenario");
    let fs_root: PathBuf = temp_dir.path().join("store");
    let fs_adapter = Arc::new(FsAdapter::new()) as Arc<dyn Adapter>;
    let fs_store = Store::new(fs_root, fs_adapter.clone());
    scenario(fs_store, fs_adapter).await;
}

// ============================================================================
// SECTION: Fixture Kinds
// ============================================================================

/// Input for [`greeting_kind`]: writes `greeting.txt` and, via
/// `onCommand`, rewrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingInput {
    /// Name interpolated into the greeting text.
    pub name: String,
    /// Carried along but excluded from identity by `greeting_kind`'s
    /// `cacheKey`, so two inputs differing only here share a `DataId`.
    #[serde(default)]
    pub note: String,
}

/// A Kind writing a single file from `input.name`, with a command handler
/// that overwrites it and a `cacheKey` that narrows identity to `name` alone
/// (scenario: cacheKey reduces identity).
#[must_use]
#[allow(clippy::expect_used, reason = "the kind name below is a non-empty literal; Kind::new cannot fail here")]
pub fn greeting_kind() -> Kind<GreetingInput> {
    Kind::new("greeting", |ctx, input: GreetingInput| async move {
        ctx.write_file("greeting.txt", format!("hello {}", input.name)).await.map_err(|err| Box::new(err) as _)?;
        Ok(InitOutcome::default())
    })
    .expect("valid kind")
    .with_cache_key(|input: &GreetingInput| serde_json::json!({ "name": input.name }))
    .with_command(|ctx| async move {
        let name = ctx.command().get("name").and_then(Value::as_str).unwrap_or("friend").to_string();
        ctx.write_file("greeting.txt", format!("hi {name}")).await.map_err(|err| Box::new(err) as _)?;
        Ok(CommandOutcome::default())
    })
}

/// Input for [`manifest_echo_kind`]. `tags` is a `HashMap`, whose `Serialize`
/// impl iterates in an order that varies between equal-content instances
/// built with different insertion orders — the case the canonical
/// serializer's key sorting exists to collapse (deterministic-hashing-
/// across-key-order scenario).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEchoInput {
    /// Fixed identifying field.
    pub name: String,
    /// Unordered key/value pairs whose insertion order the test varies.
    pub tags: std::collections::HashMap<String, String>,
}

/// A Kind whose only effect is writing its own canonicalized input back out,
/// used to assert that `DataId` does not depend on source field order.
#[must_use]
#[allow(clippy::expect_used, reason = "the kind name below is a non-empty literal; Kind::new cannot fail here")]
pub fn manifest_echo_kind() -> Kind<ManifestEchoInput> {
    Kind::new("manifest-echo", |ctx, input: ManifestEchoInput| async move {
        let text = serde_json::to_string(&input).unwrap_or_default();
        ctx.write_file("echo.json", text).await.map_err(|err| Box::new(err) as _)?;
        Ok(InitOutcome::default())
    })
    .expect("valid kind")
}

/// A Kind whose `onInit` always fails, for the failure-cleans-up scenario.
#[must_use]
#[allow(clippy::expect_used, reason = "the kind name below is a non-empty literal; Kind::new cannot fail here")]
pub fn failing_kind() -> Kind<GreetingInput> {
    Kind::new("always-fails", |_ctx, _input: GreetingInput| async move {
        Err(Box::<dyn std::error::Error + Send + Sync>::from("onInit intentionally failed"))
    })
    .expect("valid kind")
}
