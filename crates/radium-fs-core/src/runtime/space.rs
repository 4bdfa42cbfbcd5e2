// radium-fs-core/src/runtime/space.rs
// ============================================================================
// Module: Radium-FS Space
// Description: Handle to one materialized space: its manifest, content
//              directory, and (when its Kind defines one) `send` capability.
// Purpose: The value every `ensure`/`dep`/`find`/`list` call returns.
// Dependencies: crate::{core, runtime::{engine, event}}
// ============================================================================

//! ## Overview
//! A [`Space`] is a read view plus, optionally, a write capability (`send`).
//! `ensure` populates the `on_command` handle from the `Kind` it was given;
//! `find`/`list` cannot — they only know an [`Origin`], not the `Kind<I>`
//! object whose closures live in caller memory — so spaces they return
//! always answer `false` from `can_send` (§4.5.4, §4.5.6; recorded as an
//! Open Question resolution in the workspace root's design ledger).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;
use crate::core::kind::OnCommandFn;
use crate::core::manifest::Manifest;
use crate::core::manifest::Origin;
use crate::runtime::event::CommandEventTag;
use crate::runtime::event::Event;
use crate::runtime::event::EventBus;
use crate::runtime::event::Unsubscribe;
use crate::runtime::engine::StoreInner;
use crate::runtime::engine::send_command;
use crate::runtime::error::StoreError;

// ============================================================================
// SECTION: Space
// ============================================================================

/// A handle to one materialized space (§3 Data Model).
#[derive(Clone)]
pub struct Space {
    pub(crate) store: Arc<StoreInner>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) kind: KindName,
    pub(crate) data_id: DataId,
    pub(crate) content_dir: PathBuf,
    pub(crate) manifest: Manifest,
    pub(crate) on_command: Option<Arc<OnCommandFn>>,
}

impl Space {
    /// The Kind name that produced this space.
    #[must_use]
    pub fn kind(&self) -> &KindName {
        &self.kind
    }

    /// This space's content-addressed identity.
    #[must_use]
    pub fn data_id(&self) -> &DataId {
        &self.data_id
    }

    /// The absolute path of this space's content directory.
    #[must_use]
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// What produced this space, as recorded in the manifest.
    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.manifest.origin
    }

    /// The manifest as of the moment this handle was produced. Stale after a
    /// later `send` call made through a different handle to the same space.
    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The absolute path of a named export, or `None` if it does not exist.
    #[must_use]
    pub fn export_path(&self, export: &str) -> Option<PathBuf> {
        self.manifest.export_path(export).map(|relative| self.content_dir.join(relative))
    }

    /// Whether this handle carries `send` capability (§4.5.4: only spaces
    /// produced by `ensure`, for a Kind with an `onCommand` handler, can
    /// send commands).
    #[must_use]
    pub fn can_send(&self) -> bool {
        self.on_command.is_some()
    }

    /// Sends `command` to this space's `onCommand` handler, persisting the
    /// result and returning the updated manifest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if this handle has no `send`
    /// capability, or whatever error the handler itself raised
    /// ([`StoreError::UserCommand`]) or a failure writing the manifest back.
    pub async fn send(&mut self, command: Value) -> Result<&Manifest, StoreError> {
        let handler = self.on_command.clone().ok_or_else(|| {
            StoreError::Validation("this space has no onCommand handler; it was not produced by ensure".to_string())
        })?;
        let manifest = send_command(&self.store, &self.events, &self.kind, &self.data_id, &self.content_dir, handler, command).await?;
        self.manifest = manifest;
        Ok(&self.manifest)
    }

    /// Subscribes to this space's `command:start`/`command:done`/
    /// `command:error` channel.
    pub fn on_command_event(&self, tag: CommandEventTag, handler: impl Fn(&Event) + Send + Sync + 'static) -> Unsubscribe {
        self.events.on_command(self.data_id.clone(), tag, handler)
    }

    /// Subscribes to custom payloads emitted for this space via `emit`.
    pub fn on_custom(&self, handler: impl Fn(&Value) + Send + Sync + 'static) -> Unsubscribe {
        self.events.on_custom(self.data_id.clone(), handler)
    }

    /// Export map as of the last-known manifest, relative to the content
    /// directory.
    #[must_use]
    pub fn exports(&self) -> &BTreeMap<String, String> {
        &self.manifest.exports
    }
}
