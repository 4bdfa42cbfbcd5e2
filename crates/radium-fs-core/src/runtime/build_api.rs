// radium-fs-core/src/runtime/build_api.rs
// ============================================================================
// Module: Radium-FS Build API
// Description: The space-build API bound to `onInit` (§4.5.2) and the
//              command-space API bound to `onCommand` (§4.5.3): content and
//              local directory operations, plus `dep()` for the former.
// Purpose: Give user closures a narrow, directory-rooted surface instead of
//          raw filesystem paths, so `onInit`/`onCommand` can never escape
//          the tree the engine built for them by accident.
// Dependencies: crate::{interfaces, runtime::{engine, event, layout}}
// ============================================================================

//! ## Overview
//! [`ContentOps`] is the shared implementation behind every directory-rooted
//! surface in this crate: [`InitContext`]'s content directory, its `local`
//! sub-API ([`LocalOps`], a narrowed view with `copy`/`move`/`glob`/`grep`
//! hidden per §4.5.2), and [`CommandContext`]'s content directory. `dep()`
//! is the one operation unique to [`InitContext`] — it recurses back into
//! [`crate::runtime::engine`], which is why this module and `engine` import
//! each other's types freely; they are two views onto one recursive
//! algorithm.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;
use crate::core::identifiers::Scope;
use crate::core::kind::Kind;
use crate::core::manifest::DependencyRecord;
use crate::interfaces::Adapter;
use crate::interfaces::AdapterError;
use crate::interfaces::GlobOptions;
use crate::interfaces::GrepMatch;
use crate::interfaces::GrepOptions;
use crate::interfaces::RemoveOptions;
use crate::interfaces::StatInfo;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::engine::EnsureOptions;
use crate::runtime::engine::StoreInner;
use crate::runtime::engine::ensure_with;
use crate::runtime::error::StoreError;
use crate::runtime::event::Event;
use crate::runtime::event::EventBus;
use crate::runtime::layout::relative_symlink_target;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// SECTION: Directory Operation Options
// ============================================================================

/// Options for [`ContentOps::read_file`] (§4.5.2: "supports `{ startLine
/// (1-based), maxLines }`").
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadFileOptions {
    /// 1-based first line to include. Clamped at 0; lines before it are
    /// dropped.
    pub start_line: Option<u64>,
    /// Caps the number of lines returned.
    pub max_lines: Option<u64>,
}

/// Options for [`ContentOps::read_dir`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadDirOptions {
    /// Recurse into subdirectories, returning paths relative to the call's
    /// root rather than just immediate entry names.
    pub recursive: bool,
    /// Caps the number of returned paths.
    pub max_results: Option<usize>,
}

// ============================================================================
// SECTION: ContentOps
// ============================================================================

/// File operations rooted at one directory (a content directory or a
/// private `local/` directory), backed by an [`Adapter`].
///
/// Every path a caller passes is relative to this directory; `ContentOps`
/// joins it onto its root before reaching the adapter, so `onInit`/
/// `onCommand` closures never see or construct absolute paths themselves.
#[derive(Clone)]
pub struct ContentOps {
    adapter: Arc<dyn Adapter>,
    root: PathBuf,
}

impl ContentOps {
    pub(crate) fn new(adapter: Arc<dyn Adapter>, root: PathBuf) -> Self {
        Self { adapter, root }
    }

    /// The absolute path this surface is rooted at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Writes `contents` at `rel`, creating parent directories as needed.
    pub async fn write_file(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<(), AdapterError> {
        self.adapter.write_file(&self.resolve(rel), contents.as_ref()).await
    }

    /// Reads `rel`, optionally slicing to a line range (§4.5.2).
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] if the file is missing, or if line options
    /// are given and the content is not valid UTF-8.
    pub async fn read_file(&self, rel: impl AsRef<Path>, options: ReadFileOptions) -> Result<Vec<u8>, AdapterError> {
        let rel = rel.as_ref();
        let bytes = self.adapter.read_file(&self.resolve(rel)).await?;
        if options.start_line.is_none() && options.max_lines.is_none() {
            return Ok(bytes);
        }
        let text = String::from_utf8(bytes).map_err(|_| {
            AdapterError::io(
                self.resolve(rel),
                std::io::Error::new(std::io::ErrorKind::InvalidData, "not valid UTF-8 for line-ranged read"),
            )
        })?;
        let start = options.start_line.unwrap_or(1).saturating_sub(1) as usize;
        let lines: Vec<&str> = text.split('\n').collect();
        let end = match options.max_lines {
            Some(max) => start.saturating_add(max as usize).min(lines.len()),
            None => lines.len(),
        };
        let slice = if start >= lines.len() { &[][..] } else { &lines[start .. end] };
        Ok(slice.join("\n").into_bytes())
    }

    /// Creates a directory and all missing parents; idempotent.
    pub async fn mkdir(&self, rel: impl AsRef<Path>) -> Result<(), AdapterError> {
        self.adapter.mkdir(&self.resolve(rel)).await
    }

    /// Lists entries under `rel`, relative to this surface's root.
    pub async fn read_dir(&self, rel: impl AsRef<Path>, options: ReadDirOptions) -> Result<Vec<String>, AdapterError> {
        let rel = rel.as_ref().to_path_buf();
        if !options.recursive {
            return self.adapter.read_dir(&self.resolve(&rel)).await;
        }
        let mut out = Vec::new();
        let mut stack = vec![rel];
        while let Some(dir) = stack.pop() {
            for name in self.adapter.read_dir(&self.resolve(&dir)).await? {
                let child = dir.join(&name);
                out.push(child.to_string_lossy().into_owned());
                if let Some(max) = options.max_results {
                    if out.len() >= max {
                        return Ok(out);
                    }
                }
                if self.adapter.stat(&self.resolve(&child)).await.map(|info| info.is_directory).unwrap_or(false) {
                    stack.push(child);
                }
            }
        }
        Ok(out)
    }

    /// Returns metadata about `rel`, following symlinks.
    pub async fn stat(&self, rel: impl AsRef<Path>) -> Result<StatInfo, AdapterError> {
        self.adapter.stat(&self.resolve(rel)).await
    }

    /// Copies `src` to `dest`, recursing into directories. The [`Adapter`]
    /// contract has no native `copy` primitive (§4.2), so this walks the
    /// tree with `stat`/`read_dir`/`read_file`/`write_file`.
    pub fn copy<'a>(&'a self, src: impl AsRef<Path> + 'a, dest: impl AsRef<Path> + 'a) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(async move { self.copy_abs(&self.resolve(src), &self.resolve(dest)).await })
    }

    fn copy_abs<'a>(&'a self, src_abs: &'a Path, dest_abs: &'a Path) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(async move {
            let info = self.adapter.stat(src_abs).await?;
            if info.is_directory {
                self.adapter.mkdir(dest_abs).await?;
                for name in self.adapter.read_dir(src_abs).await? {
                    self.copy_abs(&src_abs.join(&name), &dest_abs.join(&name)).await?;
                }
                Ok(())
            } else {
                let bytes = self.adapter.read_file(src_abs).await?;
                self.adapter.write_file(dest_abs, &bytes).await
            }
        })
    }

    /// Moves `src` to `dest` via the adapter's atomic rename.
    pub async fn move_path(&self, src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<(), AdapterError> {
        self.adapter.rename(&self.resolve(src), &self.resolve(dest)).await
    }

    /// Removes a file or (optionally recursively) a directory at `rel`.
    pub async fn remove(&self, rel: impl AsRef<Path>, options: RemoveOptions) -> Result<(), AdapterError> {
        self.adapter.remove(&self.resolve(rel), options).await
    }

    /// Globs for paths matching `pattern`, relative to this surface's root.
    pub async fn glob(&self, pattern: &str, options: GlobOptions) -> Result<Vec<String>, AdapterError> {
        self.adapter.glob(&self.root, pattern, options).await
    }

    /// Greps for `pattern` across files under this surface's root.
    pub async fn grep(&self, pattern: &str, options: GrepOptions) -> Result<Vec<GrepMatch>, AdapterError> {
        self.adapter.grep(&self.root, pattern, options).await
    }
}

// ============================================================================
// SECTION: LocalOps
// ============================================================================

/// The `local` sub-API: a deliberately narrowed view of [`ContentOps`]
/// rooted at a space's private `local/` directory. No `copy`/`move`/`glob`/
/// `grep` — the private directory is excluded from the user's search
/// surface at the content-directory level (§4.5.2).
#[derive(Clone)]
pub struct LocalOps {
    inner: ContentOps,
}

impl LocalOps {
    pub(crate) fn new(inner: ContentOps) -> Self {
        Self { inner }
    }

    /// The absolute path of the private directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Writes `contents` at `rel` under the private directory.
    pub async fn write_file(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<(), AdapterError> {
        self.inner.write_file(rel, contents).await
    }

    /// Reads `rel` under the private directory.
    pub async fn read_file(&self, rel: impl AsRef<Path>, options: ReadFileOptions) -> Result<Vec<u8>, AdapterError> {
        self.inner.read_file(rel, options).await
    }

    /// Creates a directory under the private directory.
    pub async fn mkdir(&self, rel: impl AsRef<Path>) -> Result<(), AdapterError> {
        self.inner.mkdir(rel).await
    }

    /// Lists entries under the private directory.
    pub async fn read_dir(&self, rel: impl AsRef<Path>, options: ReadDirOptions) -> Result<Vec<String>, AdapterError> {
        self.inner.read_dir(rel, options).await
    }

    /// Returns metadata about `rel` under the private directory.
    pub async fn stat(&self, rel: impl AsRef<Path>) -> Result<StatInfo, AdapterError> {
        self.inner.stat(rel).await
    }

    /// Removes `rel` under the private directory.
    pub async fn remove(&self, rel: impl AsRef<Path>, options: RemoveOptions) -> Result<(), AdapterError> {
        self.inner.remove(rel, options).await
    }
}

// ============================================================================
// SECTION: Dep Options
// ============================================================================

/// Options for [`InitContext::dep`] (§4.5.2, §3 Dependency record).
#[derive(Debug, Clone, Default)]
pub struct DepOptions {
    /// `shared` (default) or `local`.
    pub scope: Scope,
    /// Which export of the dependency to mount. `None`/`"."` = default
    /// export, `"*"` = the dependency's content directory root directly.
    pub export: Option<String>,
    /// Extra runtime values shallow-merged onto the parent's `runtime` for
    /// this one nested `ensure` call.
    pub extra_runtime: Option<Value>,
    /// Overrides the ambient `cache` policy for this one dependency build.
    pub cache: Option<bool>,
}

fn merge_runtime_shallow(parent: &Value, extra: &Value) -> Value {
    let mut merged = match parent {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(extra_map) = extra {
        for (key, value) in extra_map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

// ============================================================================
// SECTION: InitContext
// ============================================================================

/// The space-build API bound to the temp directory of an in-progress build
/// (§4.5.2). Disappears at build completion; nothing outlives one `onInit`
/// invocation.
pub struct InitContext {
    content: ContentOps,
    local: LocalOps,
    runtime: Value,
    signal: CancelSignal,
    store: Arc<StoreInner>,
    events: Arc<EventBus>,
    parent_data_dir: PathBuf,
    kind: KindName,
    data_id: DataId,
    deps: Arc<Mutex<Vec<DependencyRecord>>>,
}

impl InitContext {
    // Internal constructor; every field is load-bearing bound state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        content: ContentOps,
        local: LocalOps,
        runtime: Value,
        signal: CancelSignal,
        store: Arc<StoreInner>,
        events: Arc<EventBus>,
        parent_data_dir: PathBuf,
        kind: KindName,
        data_id: DataId,
        deps: Arc<Mutex<Vec<DependencyRecord>>>,
    ) -> Self {
        Self { content, local, runtime, signal, store, events, parent_data_dir, kind, data_id, deps }
    }

    /// The private `local/` sub-API.
    #[must_use]
    pub fn local(&self) -> &LocalOps {
        &self.local
    }

    /// The runtime value passed through from the caller, shallow-merged
    /// with any `extra_runtime` supplied by the enclosing `dep()` call.
    #[must_use]
    pub fn runtime(&self) -> &Value {
        &self.runtime
    }

    /// The cancellation signal for this build.
    #[must_use]
    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    /// Emits a custom event. Reaches only the global channel while building
    /// (§4.4: the space handle does not exist yet).
    pub fn emit(&self, payload: Value) {
        self.events.dispatch(&Event::Custom { kind: self.kind.clone(), data_id: self.data_id.clone(), payload });
    }

    /// Recursively materializes `kind(input)` and mounts it at `mount_path`
    /// inside this build's content directory, returning the symlink's
    /// absolute path (§4.5.2).
    ///
    /// # Errors
    ///
    /// Propagates any [`StoreError`] from the nested `ensure`, plus
    /// [`StoreError::ExportNotFound`] if `options.export` names an export
    /// the dependency does not expose.
    pub async fn dep<J>(&self, mount_path: &str, kind: &Kind<J>, input: J, options: DepOptions) -> Result<PathBuf, StoreError>
    where
        J: Serialize + Send + Sync + 'static,
    {
        let local_anchor = matches!(options.scope, Scope::Local).then(|| self.parent_data_dir.clone());
        let child_runtime = match &options.extra_runtime {
            Some(extra) => merge_runtime_shallow(&self.runtime, extra),
            None => self.runtime.clone(),
        };
        let nested = EnsureOptions {
            cache: options.cache.unwrap_or(true),
            signal: self.signal.clone(),
            runtime: child_runtime,
            local_anchor,
            ..EnsureOptions::default()
        };
        let space = ensure_with(&self.store, &self.events, kind, input, nested).await?;

        let target_abs = if options.export.as_deref() == Some("*") {
            space.content_dir().to_path_buf()
        } else {
            let export_key = options.export.clone().unwrap_or_else(|| ".".to_string());
            let relative = space.manifest().export_path(&export_key).ok_or_else(|| StoreError::ExportNotFound {
                requested: export_key.clone(),
                available: space.manifest().export_names(),
            })?;
            space.content_dir().join(relative)
        };

        let link_path = self.content.resolve(mount_path);
        let rel_target = relative_symlink_target(&link_path, &target_abs);
        self.store.adapter.symlink(&rel_target, &link_path).await?;

        self.deps.lock().push(DependencyRecord {
            mount_path: mount_path.to_string(),
            origin: space.origin().clone(),
            scope: options.scope,
            export: options.export,
        });

        Ok(link_path)
    }
}

impl std::ops::Deref for InitContext {
    type Target = ContentOps;

    fn deref(&self) -> &Self::Target {
        &self.content
    }
}

// ============================================================================
// SECTION: CommandContext
// ============================================================================

/// Resolved `{exports, metadata}` as of the moment `onCommand` was invoked,
/// before the handler's own changes are applied (§4.5.3 step 4).
#[derive(Debug, Clone)]
pub struct CurrentState {
    /// Export map, relative to the content directory, as currently recorded
    /// in the manifest.
    pub exports: BTreeMap<String, String>,
    /// Metadata map as currently recorded in the manifest.
    pub metadata: BTreeMap<String, Value>,
}

/// The command-space API bound to a space's already-materialized content
/// directory (§4.5.3 step 3: "the space-build API minus `dep`").
pub struct CommandContext {
    content: ContentOps,
    local: LocalOps,
    command: Value,
    current: CurrentState,
    events: Arc<EventBus>,
    kind: KindName,
    data_id: DataId,
}

impl CommandContext {
    pub(crate) fn new(
        content: ContentOps,
        local: LocalOps,
        command: Value,
        current: CurrentState,
        events: Arc<EventBus>,
        kind: KindName,
        data_id: DataId,
    ) -> Self {
        Self { content, local, command, current, events, kind, data_id }
    }

    /// The command value passed to `send`.
    #[must_use]
    pub fn command(&self) -> &Value {
        &self.command
    }

    /// The manifest's `{exports, metadata}` before this command runs.
    #[must_use]
    pub fn current(&self) -> &CurrentState {
        &self.current
    }

    /// The private `local/` sub-API.
    #[must_use]
    pub fn local(&self) -> &LocalOps {
        &self.local
    }

    /// Emits a custom event, reaching both the global and this space's
    /// per-space custom channel (§4.4).
    pub fn emit(&self, payload: Value) {
        self.events.dispatch(&Event::Custom { kind: self.kind.clone(), data_id: self.data_id.clone(), payload });
    }
}

impl std::ops::Deref for CommandContext {
    type Target = ContentOps;

    fn deref(&self) -> &Self::Target {
        &self.content
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
    use crate::runtime::memory_adapter::MemoryAdapter;

    fn ops() -> ContentOps {
        ContentOps::new(Arc::new(MemoryAdapter::new()), PathBuf::from("/store/space"))
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let ops = ops();
        ops.write_file("a.txt", b"hello").await.expect("write");
        let contents = ops.read_file("a.txt", ReadFileOptions::default()).await.expect("read");
        assert_eq!(contents, b"hello");
    }

    #[tokio::test]
    async fn read_file_line_range_clamps_and_slices() {
        let ops = ops();
        ops.write_file("lines.txt", b"a\nb\nc\nd\n").await.expect("write");
        let contents =
            ops.read_file("lines.txt", ReadFileOptions { start_line: Some(2), max_lines: Some(2) }).await.expect("read");
        assert_eq!(String::from_utf8(contents).expect("utf8"), "b\nc");
    }

    #[tokio::test]
    async fn copy_recurses_into_directories() {
        let ops = ops();
        ops.write_file("dir/nested.txt", b"x").await.expect("write");
        ops.copy("dir", "dir2").await.expect("copy");
        let contents = ops.read_file("dir2/nested.txt", ReadFileOptions::default()).await.expect("read");
        assert_eq!(contents, b"x");
    }

    #[tokio::test]
    async fn read_dir_recursive_collects_nested_entries() {
        let ops = ops();
        ops.write_file("a/b.txt", b"x").await.expect("write");
        ops.write_file("a/c/d.txt", b"y").await.expect("write");
        let mut entries = ops.read_dir("a", ReadDirOptions { recursive: true, max_results: None }).await.expect("read_dir");
        entries.sort();
        assert_eq!(entries, vec!["b.txt".to_string(), "c".to_string(), "c/d.txt".to_string()]);
    }

    #[test]
    fn merge_runtime_shallow_overrides_only_named_keys() {
        let parent = serde_json::json!({"env": "prod", "region": "us"});
        let extra = serde_json::json!({"region": "eu"});
        let merged = merge_runtime_shallow(&parent, &extra);
        assert_eq!(merged, serde_json::json!({"env": "prod", "region": "eu"}));
    }
}
