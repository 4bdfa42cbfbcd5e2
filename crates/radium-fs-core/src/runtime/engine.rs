// radium-fs-core/src/runtime/engine.rs
// ============================================================================
// Module: Radium-FS Store Engine
// Description: The async build/command engine: ensure, dep (via build_api),
//              send, find, has, remove, list, and global event subscription.
// Purpose: The one place that owns the atomic build protocol (§4.5.1) and
//          command execution (§4.5.3) over an Adapter and optional Locker.
// Dependencies: tokio, parking_lot, rand, time, tracing,
//               crate::{core, interfaces, runtime::{build_api, event, layout,
//               space}}
// ============================================================================

//! ## Overview
//! [`Store`] is the public handle; [`StoreInner`] is the engine state it
//! shares (via `Arc`) with every [`crate::runtime::build_api::InitContext`]
//! so `dep()` can recurse back into [`ensure_with`] without the engine
//! itself needing to be generic over any one Kind's input type. A `Store`
//! is cheap to clone — it is two `Arc`s — and is meant to be held for a
//! process's whole lifetime, the way [`crate::runtime::event::EventBus`]
//! is (§4: one Store per store root, for the life of the program).
//!
//! `tracing` events mark the decision points a caller debugging a stuck
//! build would want: lock wait/acquired, cache hit vs. miss, and rename-race
//! recovery. This crate has no outer HTTP/CLI layer to emit these from, so
//! the engine emits them itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing::warn;

use crate::core::hashing::data_id;
use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;
use crate::core::kind::Kind;
use crate::core::kind::OnCommandFn;
use crate::core::manifest::CommandRecord;
use crate::core::manifest::CommandResult;
use crate::core::manifest::Manifest;
use crate::core::manifest::Origin;
use crate::core::manifest::MANIFEST_VERSION;
use crate::interfaces::Adapter;
use crate::interfaces::AdapterError;
use crate::interfaces::LockHandle;
use crate::interfaces::Locker;
use crate::interfaces::RemoveOptions;
use crate::runtime::build_api::CommandContext;
use crate::runtime::build_api::ContentOps;
use crate::runtime::build_api::CurrentState;
use crate::runtime::build_api::InitContext;
use crate::runtime::build_api::LocalOps;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::error::StoreError;
use crate::runtime::event::Event;
use crate::runtime::event::EventBus;
use crate::runtime::event::Unsubscribe;
use crate::runtime::layout;
use crate::runtime::space::Space;

// ============================================================================
// SECTION: EnsureOptions
// ============================================================================

/// Called once the cache/lock checks are complete and `onInit` is about to
/// run (§4.4 `onStart`).
pub type OnStartFn = dyn Fn(&KindName, &DataId, &Value) + Send + Sync;
/// Called when `ensure` is served from an existing manifest instead of
/// building (§4.4 `onCached`).
pub type OnCachedFn = dyn Fn(&KindName, &DataId, &Value, &Path) + Send + Sync;
/// Called when a build finishes and its temp directory has been renamed
/// into place (§4.4 `onDone`).
pub type OnDoneFn = dyn Fn(&KindName, &DataId, &Value, &Path, &BTreeMap<String, PathBuf>, &BTreeMap<String, Value>) + Send + Sync;
/// Called when `onInit` fails, after the temp directory has been cleaned up
/// (§4.4 `onError`).
pub type OnErrorFn = dyn Fn(&KindName, &DataId, &Value, &StoreError) + Send + Sync;

/// Options for [`Store::ensure`] and, internally, for each nested `dep()`
/// build (§4.5.1, §4.5.2).
#[derive(Clone)]
pub struct EnsureOptions {
    /// Whether a pre-existing space should be served as-is. `false` forces
    /// a single-phase remove-then-rebuild (§9 Open Question: `ensure`
    /// resolution).
    pub cache: bool,
    /// Cooperative cancellation, checked before lock acquisition and before
    /// entering the build path.
    pub signal: CancelSignal,
    /// Opaque runtime value threaded through to `onInit` unchanged.
    pub runtime: Value,
    /// When set, this build's data directory nests under the named parent's
    /// `.radium-fs-local-deps/` tree instead of the store-root-shared tree
    /// (§4.5.2 `scope: local`).
    pub local_anchor: Option<PathBuf>,
    /// Called at `init:start`, in addition to any global subscriber (§4.4).
    pub on_start: Option<Arc<OnStartFn>>,
    /// Called at `init:cached`, in addition to any global subscriber (§4.4).
    pub on_cached: Option<Arc<OnCachedFn>>,
    /// Called at `init:done`, in addition to any global subscriber (§4.4).
    pub on_done: Option<Arc<OnDoneFn>>,
    /// Called at `init:error`, in addition to any global subscriber (§4.4).
    pub on_error: Option<Arc<OnErrorFn>>,
}

impl Default for EnsureOptions {
    fn default() -> Self {
        Self {
            cache: true,
            signal: CancelSignal::new(),
            runtime: Value::Null,
            local_anchor: None,
            on_start: None,
            on_cached: None,
            on_done: None,
            on_error: None,
        }
    }
}

// ============================================================================
// SECTION: StoreInner
// ============================================================================

/// Shared engine state behind every [`Store`] clone and every in-flight
/// build's [`InitContext`].
pub struct StoreInner {
    pub(crate) adapter: Arc<dyn Adapter>,
    pub(crate) locker: Option<Arc<dyn Locker>>,
    pub(crate) store_root: PathBuf,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// The Radium-FS Store engine: `ensure`, `send`, `find`, `has`, `remove`,
/// `list`, and global event subscription (§4).
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
    events: Arc<EventBus>,
}

impl Store {
    /// Creates a Store rooted at `store_root`, with no cross-builder lock
    /// coordination (safe for single-process use; concurrent `ensure`
    /// calls for the same `DataId` race the filesystem's own atomicity).
    #[must_use]
    pub fn new(store_root: impl Into<PathBuf>, adapter: Arc<dyn Adapter>) -> Self {
        Self::with_locker(store_root, adapter, None)
    }

    /// Creates a Store with a [`Locker`] serializing concurrent builds of
    /// the same `DataId` (§5).
    #[must_use]
    pub fn with_locker(store_root: impl Into<PathBuf>, adapter: Arc<dyn Adapter>, locker: Option<Arc<dyn Locker>>) -> Self {
        Self { inner: Arc::new(StoreInner { adapter, locker, store_root: store_root.into() }), events: EventBus::new() }
    }

    /// Materializes `kind(input)`, returning a cached space or building a
    /// new one (§4.5.1).
    ///
    /// # Errors
    ///
    /// See [`StoreError`]: user errors from `onInit` are carried as
    /// [`StoreError::UserInit`]; adapter/lock failures propagate via
    /// `#[from]`.
    pub async fn ensure<I>(&self, kind: &Kind<I>, input: I, options: EnsureOptions) -> Result<Space, StoreError>
    where
        I: Serialize + Send + Sync + 'static,
    {
        ensure_with(&self.inner, &self.events, kind, input, options).await
    }

    /// Looks up an already-materialized space by its [`Origin`], without
    /// access to the `Kind` that produced it — the returned handle never
    /// has `send` capability (§4.5.4, §4.5.6).
    ///
    /// # Errors
    ///
    /// Propagates adapter failures and corrupt-manifest errors.
    pub async fn find(&self, origin: &Origin) -> Result<Option<Space>, StoreError> {
        find_origin(&self.inner, &self.events, origin).await
    }

    /// Whether a space for `origin` currently exists.
    ///
    /// # Errors
    ///
    /// Propagates whatever [`Store::find`] propagates.
    pub async fn has(&self, origin: &Origin) -> Result<bool, StoreError> {
        Ok(self.find(origin).await?.is_some())
    }

    /// Removes a space's entire data directory and purges its per-space
    /// event listeners, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Propagates adapter failures other than "not found".
    pub async fn remove(&self, origin: &Origin) -> Result<bool, StoreError> {
        let id = data_id(&origin.kind, Some(origin.effective_input()));
        let dir = layout::shared_data_dir(&self.inner.store_root, &origin.kind, &id);
        let existed = self.inner.adapter.exists(&layout::manifest_path(&dir)).await;
        remove_data_dir(&self.inner.adapter, &dir).await?;
        self.events.purge(&id);
        Ok(existed)
    }

    /// Lists every space ever built under the store-shared tree, optionally
    /// narrowed to one `kind` (§4.5; §4.5.6: "list(kindName?)" — absent
    /// `kind` walks every kind subdirectory of `.radium-fs-data`).
    /// Local-scoped spaces are not enumerated here, matching their private,
    /// parent-relative lifetime. Returned spaces never have `send`
    /// capability, matching [`Store::find`].
    ///
    /// # Errors
    ///
    /// Propagates adapter failures and corrupt-manifest errors.
    pub async fn list(&self, kind: Option<&KindName>) -> Result<Vec<Space>, StoreError> {
        list_kind(&self.inner, &self.events, kind).await
    }

    /// Subscribes to every event the engine emits, across every space.
    pub fn on_global(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> Unsubscribe {
        self.events.on_global(handler)
    }
}

// ============================================================================
// SECTION: ensure_with
// ============================================================================

/// The free-standing implementation behind [`Store::ensure`] and
/// [`InitContext::dep`]'s recursive nested builds. Takes `&Arc<StoreInner>`
/// rather than `&Store` so `dep()` (which only holds a `StoreInner` handle,
/// to avoid threading a generic `Store<I>` through the crate) can call it
/// directly.
pub(crate) async fn ensure_with<I>(
    inner: &Arc<StoreInner>,
    events: &Arc<EventBus>,
    kind: &Kind<I>,
    input: I,
    options: EnsureOptions,
) -> Result<Space, StoreError>
where
    I: Serialize + Send + Sync + 'static,
{
    if options.signal.is_aborted() {
        return Err(StoreError::Aborted);
    }

    let cache_key_value = kind.effective_cache_key(&input);
    let input_json = serde_json::to_value(&input).unwrap_or(Value::Null);
    let has_cache_key_fn = cache_key_value != input_json;
    let id = data_id(kind.name(), Some(&cache_key_value));
    let data_dir = layout::data_dir(&inner.store_root, kind.name(), &id, options.local_anchor.as_deref());
    let manifest_path = layout::manifest_path(&data_dir);

    if options.cache {
        if let Some(manifest) = read_manifest(&inner.adapter, &manifest_path).await? {
            debug!(kind = %kind.name(), data_id = %id, "ensure: cache hit");
            return Ok(cache_hit(inner, events, kind, &id, &data_dir, manifest, input_json, options.on_cached.as_deref()));
        }
    } else {
        debug!(kind = %kind.name(), data_id = %id, "ensure: cache:false, removing any existing space before rebuild");
        remove_data_dir(&inner.adapter, &data_dir).await?;
        events.purge(&id);
    }

    let lock_handle: Option<Box<dyn LockHandle>> = match &inner.locker {
        Some(locker) => {
            debug!(kind = %kind.name(), data_id = %id, "ensure: waiting for lock");
            let handle = locker.acquire(id.as_str(), &options.signal).await?;
            debug!(kind = %kind.name(), data_id = %id, "ensure: lock acquired");
            Some(handle)
        }
        None => None,
    };

    // Double-checked: another builder may have finished while we waited.
    if options.cache {
        if let Some(manifest) = read_manifest(&inner.adapter, &manifest_path).await? {
            if let Some(handle) = lock_handle {
                handle.release().await;
            }
            debug!(kind = %kind.name(), data_id = %id, "ensure: cache hit after lock wait");
            return Ok(cache_hit(inner, events, kind, &id, &data_dir, manifest, input_json, options.on_cached.as_deref()));
        }
    }

    if options.signal.is_aborted() {
        if let Some(handle) = lock_handle {
            handle.release().await;
        }
        return Err(StoreError::Aborted);
    }

    events.dispatch(&Event::InitStart { kind: kind.name().clone(), data_id: id.clone(), input: input_json.clone() });
    if let Some(on_start) = &options.on_start {
        on_start(kind.name(), &id, &input_json);
    }
    debug!(kind = %kind.name(), data_id = %id, "ensure: build started");

    let rand_suffix = random_suffix();
    let temp_dir = layout::temp_dir(&data_dir, &id, &rand_suffix);
    let content_temp = layout::content_dir(&temp_dir);
    let private_temp = layout::private_dir(&temp_dir);

    if let Err(err) = inner.adapter.mkdir(&content_temp).await {
        return fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, err.into(), options.on_error.as_deref()).await;
    }
    if let Err(err) = inner.adapter.mkdir(&private_temp).await {
        return fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, err.into(), options.on_error.as_deref()).await;
    }

    let deps = Arc::new(Mutex::new(Vec::new()));
    let content_ops = ContentOps::new(inner.adapter.clone(), content_temp.clone());
    let local_ops = LocalOps::new(ContentOps::new(inner.adapter.clone(), private_temp));
    let ctx = InitContext::new(
        content_ops,
        local_ops,
        options.runtime.clone(),
        options.signal.clone(),
        inner.clone(),
        events.clone(),
        data_dir.clone(),
        kind.name().clone(),
        id.clone(),
        deps.clone(),
    );

    match kind.run_init(ctx, input).await {
        Ok(outcome) => {
            let exports_rel = outcome.exports.normalize();
            let now = now_iso8601();
            let dependencies = deps.lock().clone();
            let manifest = Manifest {
                version: MANIFEST_VERSION,
                origin: Origin {
                    kind: kind.name().clone(),
                    input: input_json.clone(),
                    cache_key: has_cache_key_fn.then(|| cache_key_value.clone()),
                },
                exports: exports_rel.clone(),
                dependencies,
                commands: Vec::new(),
                metadata: outcome.metadata.clone(),
                created_at: now.clone(),
                updated_at: now,
            };

            let manifest_bytes = match serde_json::to_vec_pretty(&manifest) {
                Ok(bytes) => bytes,
                Err(err) => {
                    let store_err = StoreError::FinalizeFailed(format!("failed to serialize manifest: {err}"));
                    return fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, store_err, options.on_error.as_deref()).await;
                }
            };
            if let Err(err) = inner.adapter.write_file(&layout::manifest_path(&temp_dir), &manifest_bytes).await {
                return fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, err.into(), options.on_error.as_deref()).await;
            }

            match inner.adapter.rename(&temp_dir, &data_dir).await {
                Ok(()) => {
                    let content_dir = layout::content_dir(&data_dir);
                    let export_paths: BTreeMap<String, PathBuf> =
                        exports_rel.iter().map(|(name, rel)| (name.clone(), content_dir.join(rel))).collect();
                    events.dispatch(&Event::InitDone {
                        kind: kind.name().clone(),
                        data_id: id.clone(),
                        input: input_json.clone(),
                        path: content_dir.clone(),
                        exports: export_paths.clone(),
                        metadata: manifest.metadata.clone(),
                    });
                    if let Some(on_done) = &options.on_done {
                        on_done(kind.name(), &id, &input_json, &content_dir, &export_paths, &manifest.metadata);
                    }
                    if let Some(handle) = lock_handle {
                        handle.release().await;
                    }
                    debug!(kind = %kind.name(), data_id = %id, "ensure: build finalized");
                    Ok(build_space(inner, events, kind, &id, content_dir, manifest))
                }
                Err(_rename_err) => {
                    // Rename race: another builder (no shared Locker, or a
                    // different process) may have won concurrently.
                    if let Some(winner) = read_manifest(&inner.adapter, &manifest_path).await? {
                        warn!(kind = %kind.name(), data_id = %id, "ensure: rename race, adopting winner's manifest");
                        let _ = inner.adapter.remove(&temp_dir, RemoveOptions { recursive: true }).await;
                        if let Some(handle) = lock_handle {
                            handle.release().await;
                        }
                        let content_dir = layout::content_dir(&data_dir);
                        events.dispatch(&Event::InitCached {
                            kind: kind.name().clone(),
                            data_id: id.clone(),
                            input: input_json.clone(),
                            path: content_dir.clone(),
                        });
                        if let Some(on_cached) = &options.on_cached {
                            on_cached(kind.name(), &id, &input_json, &content_dir);
                        }
                        Ok(build_space(inner, events, kind, &id, content_dir, winner))
                    } else {
                        let store_err = StoreError::FinalizeFailed("rename failed and no winning space was found".to_string());
                        fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, store_err, options.on_error.as_deref()).await
                    }
                }
            }
        }
        Err(user_err) => {
            fail_init(inner, events, lock_handle, kind, &id, &temp_dir, &input_json, StoreError::UserInit(user_err), options.on_error.as_deref()).await
        }
    }
}

async fn fail_init<I>(
    inner: &Arc<StoreInner>,
    events: &Arc<EventBus>,
    lock_handle: Option<Box<dyn LockHandle>>,
    kind: &Kind<I>,
    id: &DataId,
    temp_dir: &Path,
    input_json: &Value,
    error: StoreError,
    on_error: Option<&OnErrorFn>,
) -> Result<Space, StoreError> {
    let _ = inner.adapter.remove(temp_dir, RemoveOptions { recursive: true }).await;
    let arc_err = Arc::new(error);
    events.dispatch(&Event::InitError {
        kind: kind.name().clone(),
        data_id: id.clone(),
        input: input_json.clone(),
        error: arc_err.clone(),
    });
    if let Some(on_error) = on_error {
        on_error(kind.name(), id, input_json, &arc_err);
    }
    if let Some(handle) = lock_handle {
        handle.release().await;
    }
    Err(Arc::try_unwrap(arc_err).unwrap_or_else(|arc| StoreError::Validation(format!("onInit failed: {arc}"))))
}

fn cache_hit<I>(
    inner: &Arc<StoreInner>,
    events: &Arc<EventBus>,
    kind: &Kind<I>,
    id: &DataId,
    data_dir: &Path,
    manifest: Manifest,
    input_json: Value,
    on_cached: Option<&OnCachedFn>,
) -> Space {
    let content_dir = layout::content_dir(data_dir);
    events.dispatch(&Event::InitCached { kind: kind.name().clone(), data_id: id.clone(), input: input_json.clone(), path: content_dir.clone() });
    if let Some(on_cached) = on_cached {
        on_cached(kind.name(), id, &input_json, &content_dir);
    }
    build_space(inner, events, kind, id, content_dir, manifest)
}

fn build_space<I>(inner: &Arc<StoreInner>, events: &Arc<EventBus>, kind: &Kind<I>, id: &DataId, content_dir: PathBuf, manifest: Manifest) -> Space {
    Space {
        store: inner.clone(),
        events: events.clone(),
        kind: kind.name().clone(),
        data_id: id.clone(),
        content_dir,
        manifest,
        on_command: kind.command_handler(),
    }
}

// ============================================================================
// SECTION: send_command
// ============================================================================

/// The free-standing implementation behind [`Space::send`].
pub(crate) async fn send_command(
    inner: &Arc<StoreInner>,
    events: &Arc<EventBus>,
    kind: &KindName,
    data_id: &DataId,
    content_dir: &Path,
    handler: Arc<OnCommandFn>,
    command: Value,
) -> Result<Manifest, StoreError> {
    let data_dir = content_dir
        .parent()
        .ok_or_else(|| StoreError::Validation("content directory has no parent data directory".to_string()))?;
    let manifest_path = layout::manifest_path(data_dir);
    let mut manifest = read_manifest(&inner.adapter, &manifest_path)
        .await?
        .ok_or_else(|| StoreError::Validation("space manifest is missing; was it removed concurrently?".to_string()))?;

    events.dispatch(&Event::CommandStart { kind: kind.clone(), data_id: data_id.clone(), command: command.clone() });

    let current = CurrentState { exports: manifest.exports.clone(), metadata: manifest.metadata.clone() };
    let content_ops = ContentOps::new(inner.adapter.clone(), content_dir.to_path_buf());
    let local_ops = LocalOps::new(ContentOps::new(inner.adapter.clone(), layout::private_dir(data_dir)));
    let ctx = CommandContext::new(content_ops, local_ops, command.clone(), current, events.clone(), kind.clone(), data_id.clone());

    match handler(ctx).await {
        Ok(outcome) => {
            if let Some(exports) = outcome.exports {
                manifest.exports = exports;
            }
            if let Some(metadata) = outcome.metadata {
                manifest.metadata = metadata;
            }
            let now = now_iso8601();
            manifest.commands.push(CommandRecord {
                command: command.clone(),
                executed_at: now.clone(),
                result: Some(CommandResult { exports: manifest.exports.clone(), metadata: manifest.metadata.clone() }),
            });
            manifest.updated_at = now;

            let bytes = serde_json::to_vec_pretty(&manifest)
                .map_err(|err| StoreError::FinalizeFailed(format!("failed to serialize manifest: {err}")))?;
            inner.adapter.write_file(&manifest_path, &bytes).await?;

            let export_paths: BTreeMap<String, PathBuf> =
                manifest.exports.iter().map(|(name, rel)| (name.clone(), content_dir.join(rel))).collect();
            events.dispatch(&Event::CommandDone {
                kind: kind.clone(),
                data_id: data_id.clone(),
                command,
                exports: export_paths,
                metadata: manifest.metadata.clone(),
            });
            Ok(manifest)
        }
        Err(user_err) => {
            let arc_err = Arc::new(StoreError::UserCommand(user_err));
            events.dispatch(&Event::CommandError { kind: kind.clone(), data_id: data_id.clone(), command, error: arc_err.clone() });
            Err(Arc::try_unwrap(arc_err).unwrap_or_else(|arc| StoreError::Validation(format!("onCommand failed: {arc}"))))
        }
    }
}

// ============================================================================
// SECTION: find / list helpers
// ============================================================================

async fn find_origin(inner: &Arc<StoreInner>, events: &Arc<EventBus>, origin: &Origin) -> Result<Option<Space>, StoreError> {
    let id = data_id(&origin.kind, Some(origin.effective_input()));
    let data_dir = layout::shared_data_dir(&inner.store_root, &origin.kind, &id);
    let manifest_path = layout::manifest_path(&data_dir);
    match read_manifest(&inner.adapter, &manifest_path).await? {
        Some(manifest) => Ok(Some(Space {
            store: inner.clone(),
            events: events.clone(),
            kind: origin.kind.clone(),
            data_id: id,
            content_dir: layout::content_dir(&data_dir),
            manifest,
            on_command: None,
        })),
        None => Ok(None),
    }
}

async fn list_kind(inner: &Arc<StoreInner>, events: &Arc<EventBus>, kind: Option<&KindName>) -> Result<Vec<Space>, StoreError> {
    let data_root = inner.store_root.join(layout::DATA_DIR_NAME);
    let kind_names: Vec<String> = match kind {
        Some(kind) => vec![kind.as_str().to_string()],
        None => match inner.adapter.read_dir(&data_root).await {
            Ok(names) => names,
            Err(AdapterError::NotFound(_)) => return Ok(Vec::new()),
            Err(other) => return Err(other.into()),
        },
    };

    let mut spaces = Vec::new();
    for kind_name in kind_names {
        let kind_dir = data_root.join(&kind_name);
        let shard_names = match inner.adapter.read_dir(&kind_dir).await {
            Ok(names) => names,
            Err(AdapterError::NotFound(_)) => continue,
            Err(other) => return Err(other.into()),
        };
        for shard in shard_names {
            let shard_dir = kind_dir.join(&shard);
            let id_names = match inner.adapter.read_dir(&shard_dir).await {
                Ok(names) => names,
                Err(AdapterError::NotFound(_)) => continue,
                Err(other) => return Err(other.into()),
            };
            for id_name in id_names {
                if layout::is_temp_entry_name(&id_name) {
                    continue;
                }
                let data_dir = shard_dir.join(&id_name);
                let Some(manifest) = read_manifest(&inner.adapter, &layout::manifest_path(&data_dir)).await? else { continue };
                let Ok(data_id) = DataId::parse(id_name) else { continue };
                spaces.push(Space {
                    store: inner.clone(),
                    events: events.clone(),
                    kind: manifest.origin.kind.clone(),
                    data_id,
                    content_dir: layout::content_dir(&data_dir),
                    manifest,
                    on_command: None,
                });
            }
        }
    }
    Ok(spaces)
}

// ============================================================================
// SECTION: Shared small helpers
// ============================================================================

async fn read_manifest(adapter: &Arc<dyn Adapter>, manifest_path: &Path) -> Result<Option<Manifest>, StoreError> {
    match adapter.read_file(manifest_path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StoreError::FinalizeFailed(format!("corrupt manifest at {}: {err}", manifest_path.display()))),
        Err(AdapterError::NotFound(_)) => Ok(None),
        Err(other) => Err(other.into()),
    }
}

async fn remove_data_dir(adapter: &Arc<dyn Adapter>, data_dir: &Path) -> Result<(), StoreError> {
    match adapter.remove(data_dir, RemoveOptions { recursive: true }).await {
        Ok(()) => Ok(()),
        Err(AdapterError::NotFound(_)) => Ok(()),
        Err(other) => Err(other.into()),
    }
}

fn random_suffix() -> String {
    let value: u64 = rand::thread_rng().gen();
    format!("{value:016x}")
}

fn now_iso8601() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::core::kind::CommandOutcome;
    use crate::core::kind::InitOutcome;
    use crate::runtime::memory_adapter::MemoryAdapter;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct GreetingInput {
        name: String,
    }

    fn greeting_kind() -> Kind<GreetingInput> {
        Kind::new("greeting", |ctx, input: GreetingInput| async move {
            ctx.write_file("greeting.txt", format!("hello {}", input.name)).await.map_err(|err| Box::new(err) as _)?;
            Ok(InitOutcome::default())
        })
        .expect("valid kind")
        .with_command(|ctx| async move {
            let name = ctx.command().get("name").and_then(Value::as_str).unwrap_or("friend").to_string();
            ctx.write_file("greeting.txt", format!("hi {name}")).await.map_err(|err| Box::new(err) as _)?;
            Ok(CommandOutcome::default())
        })
    }

    fn store() -> Store {
        Store::new("/store", Arc::new(MemoryAdapter::new()))
    }

    #[tokio::test]
    async fn ensure_builds_then_serves_from_cache() {
        let store = store();
        let kind = greeting_kind();
        let space = store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        let contents = store.inner.adapter.read_file(&space.content_dir().join("greeting.txt")).await.expect("read");
        assert_eq!(contents, b"hello Ada");

        let hits = Arc::new(Mutex::new(0usize));
        let counted = hits.clone();
        let unsubscribe = store.on_global(move |event| {
            if matches!(event, Event::InitCached { .. }) {
                *counted.lock() += 1;
            }
        });
        let second = store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        assert_eq!(second.data_id(), space.data_id());
        assert_eq!(*hits.lock(), 1);
        unsubscribe();
    }

    #[tokio::test]
    async fn ensure_cache_false_rebuilds() {
        let store = store();
        let kind = greeting_kind();
        let first = store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        let rebuilt = store
            .ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions { cache: false, ..EnsureOptions::default() })
            .await
            .expect("ensure");
        assert_eq!(first.data_id(), rebuilt.data_id());
    }

    #[tokio::test]
    async fn send_updates_manifest_and_persists() {
        let store = store();
        let kind = greeting_kind();
        let mut space = store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        assert!(space.can_send());
        space.send(json!({"name": "Grace"})).await.expect("send");
        let contents = store.inner.adapter.read_file(&space.content_dir().join("greeting.txt")).await.expect("read");
        assert_eq!(contents, b"hi Grace");
        assert_eq!(space.manifest().commands.len(), 1);
    }

    #[tokio::test]
    async fn find_has_remove_round_trip() {
        let store = store();
        let kind = greeting_kind();
        let space = store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        let origin = space.origin().clone();

        assert!(store.has(&origin).await.expect("has"));
        let found = store.find(&origin).await.expect("find").expect("present");
        assert!(!found.can_send());
        assert_eq!(found.data_id(), space.data_id());

        let removed = store.remove(&origin).await.expect("remove");
        assert!(removed);
        assert!(!store.has(&origin).await.expect("has"));
    }

    #[tokio::test]
    async fn list_returns_every_space_for_a_kind() {
        let store = store();
        let kind = greeting_kind();
        store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        store.ensure(&kind, GreetingInput { name: "Grace".to_string() }, EnsureOptions::default()).await.expect("ensure");
        let spaces = store.list(Some(kind.name())).await.expect("list");
        assert_eq!(spaces.len(), 2);
        assert!(!spaces[0].can_send(), "list() never reconstructs send capability");
    }

    #[tokio::test]
    async fn list_with_no_kind_scans_every_kind() {
        let store = store();
        let kind = greeting_kind();
        let other_kind = Kind::<GreetingInput>::new("farewell", |ctx, input: GreetingInput| async move {
            ctx.write_file("farewell.txt", format!("bye {}", input.name)).await.map_err(|err| Box::new(err) as _)?;
            Ok(InitOutcome::default())
        })
        .expect("valid kind");

        store.ensure(&kind, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        store.ensure(&other_kind, GreetingInput { name: "Grace".to_string() }, EnsureOptions::default()).await.expect("ensure");

        let spaces = store.list(None).await.expect("list");
        assert_eq!(spaces.len(), 2);
    }

    #[tokio::test]
    async fn dep_mounts_symlink_and_records_dependency() {
        let store = store();
        let leaf = greeting_kind();
        let parent = Kind::<GreetingInput>::new("parent", move |ctx, input: GreetingInput| {
            let leaf = leaf.clone();
            async move {
                ctx.dep("leaf", &leaf, input, crate::runtime::build_api::DepOptions::default()).await.map_err(|err| Box::new(err) as _)?;
                Ok(InitOutcome::default())
            }
        })
        .expect("valid kind");

        let space = store.ensure(&parent, GreetingInput { name: "Ada".to_string() }, EnsureOptions::default()).await.expect("ensure");
        assert_eq!(space.manifest().dependencies.len(), 1);
        let link_path = space.content_dir().join("leaf");
        let contents = store.inner.adapter.read_file(&link_path.join("greeting.txt")).await.expect("read through dep link");
        assert_eq!(contents, b"hello Ada");
    }
}
