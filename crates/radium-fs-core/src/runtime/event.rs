// radium-fs-core/src/runtime/event.rs
// ============================================================================
// Module: Radium-FS Event Bus
// Description: Three-tier event routing: global, per-space command,
//              per-space custom; leak-free teardown on `remove`.
// Purpose: Deliver build/command lifecycle and user-emitted custom events to
//          subscribers without letting a throwing handler break delivery.
// Dependencies: parking_lot
// ============================================================================

//! ## Overview
//! Implements §4.4. A single [`EventBus`] instance lives on
//! [`crate::runtime::engine::Store`] for its whole lifetime; global listeners
//! live as long as the bus, per-space listener maps are created lazily on
//! first subscription and deleted by [`EventBus::purge`] when a space is
//! removed (§9 "Event-listener ownership").
//!
//! `parking_lot::Mutex` is used rather than `std::sync::Mutex` for the same
//! reason the rest of this crate's in-process registries do: no poisoning to
//! thread through a `Result` for a lock that is only ever held for the
//! duration of a `Vec` push/iterate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use serde_json::Value;

use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;
use crate::runtime::error::StoreError;

// ============================================================================
// SECTION: Event
// ============================================================================

/// One event emitted by the engine or by user code via `emit` (§4.4).
#[derive(Debug, Clone)]
pub enum Event {
    /// A build has begun, after the cache check and lock acquisition.
    InitStart { kind: KindName, data_id: DataId, input: Value },
    /// A cache hit served an `ensure`.
    InitCached { kind: KindName, data_id: DataId, input: Value, path: PathBuf },
    /// A build finished and the temp directory was renamed into place.
    InitDone {
        kind: KindName,
        data_id: DataId,
        input: Value,
        path: PathBuf,
        exports: BTreeMap<String, PathBuf>,
        metadata: BTreeMap<String, Value>,
    },
    /// A build failed; the temp directory has already been cleaned up.
    InitError { kind: KindName, data_id: DataId, input: Value, error: Arc<StoreError> },
    /// A `send` call began.
    CommandStart { kind: KindName, data_id: DataId, command: Value },
    /// A `send` call finished successfully.
    CommandDone {
        kind: KindName,
        data_id: DataId,
        command: Value,
        exports: BTreeMap<String, PathBuf>,
        metadata: BTreeMap<String, Value>,
    },
    /// A `send` call failed; the manifest is unchanged.
    CommandError { kind: KindName, data_id: DataId, command: Value, error: Arc<StoreError> },
    /// A payload emitted by user code via `emit` inside `onInit`/`onCommand`.
    Custom { kind: KindName, data_id: DataId, payload: Value },
}

impl Event {
    /// The `dataId` this event concerns, for routing to per-space maps.
    #[must_use]
    pub fn data_id(&self) -> &DataId {
        match self {
            Self::InitStart { data_id, .. }
            | Self::InitCached { data_id, .. }
            | Self::InitDone { data_id, .. }
            | Self::InitError { data_id, .. }
            | Self::CommandStart { data_id, .. }
            | Self::CommandDone { data_id, .. }
            | Self::CommandError { data_id, .. }
            | Self::Custom { data_id, .. } => data_id,
        }
    }
}

/// Tag used to subscribe to a subset of the per-space command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandEventTag {
    /// `command:start`.
    Start,
    /// `command:done`.
    Done,
    /// `command:error`.
    Error,
}

impl CommandEventTag {
    fn matches(self, event: &Event) -> bool {
        matches!(
            (self, event),
            (Self::Start, Event::CommandStart { .. })
                | (Self::Done, Event::CommandDone { .. })
                | (Self::Error, Event::CommandError { .. })
        )
    }
}

/// Cancels a subscription when called. Calling it more than once is a no-op.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

type GlobalHandler = Arc<dyn Fn(&Event) + Send + Sync>;
type CommandHandler = Arc<dyn Fn(&Event) + Send + Sync>;
type CustomHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    global: Vec<(u64, GlobalHandler)>,
    command: HashMap<DataId, Vec<(u64, CommandEventTag, CommandHandler)>>,
    custom: HashMap<DataId, Vec<(u64, CustomHandler)>>,
}

// ============================================================================
// SECTION: EventBus
// ============================================================================

/// The store-wide event bus: one global channel plus lazily created
/// per-space command and custom channels.
///
/// Always constructed behind an `Arc` ([`EventBus::new`]) so a subscription's
/// returned [`Unsubscribe`] closure can hold a [`Weak`] back to the bus
/// instead of borrowing it, letting `on_global`/`on_command`/`on_custom`
/// take `&self` rather than forcing every caller to thread an `Arc` through.
pub struct EventBus {
    self_weak: Weak<EventBus>,
    inner: Mutex<Inner>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self { self_weak: weak.clone(), inner: Mutex::new(Inner::default()) })
    }

    /// Subscribes to every event on the global channel.
    pub fn on_global(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> Unsubscribe {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.global.push((id, Arc::new(handler)));
        drop(inner);
        self.unsubscribe_global(id)
    }

    /// Subscribes to one command-event tag for a specific space.
    pub fn on_command(
        &self,
        data_id: DataId,
        tag: CommandEventTag,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Unsubscribe {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.command.entry(data_id.clone()).or_default().push((id, tag, Arc::new(handler)));
        drop(inner);
        self.unsubscribe_command(data_id, id)
    }

    /// Subscribes to custom payloads emitted for a specific space.
    pub fn on_custom(&self, data_id: DataId, handler: impl Fn(&Value) + Send + Sync + 'static) -> Unsubscribe {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.custom.entry(data_id.clone()).or_default().push((id, Arc::new(handler)));
        drop(inner);
        self.unsubscribe_custom(data_id, id)
    }

    /// Delivers `event` to the global channel and, as applicable, to the
    /// per-space command/custom channels for its `dataId`.
    ///
    /// A handler that panics is isolated via `catch_unwind`: the panic is
    /// swallowed and delivery to the remaining handlers (and back to the
    /// engine) continues (§7 "Errors thrown by event listeners are
    /// swallowed").
    pub fn dispatch(&self, event: &Event) {
        let global = self.inner.lock().global.clone();
        for (_, handler) in &global {
            invoke_isolated(handler.as_ref(), event);
        }

        match event {
            Event::Custom { .. } => {
                let data_id = event.data_id();
                let listeners = self.inner.lock().custom.get(data_id).cloned().unwrap_or_default();
                if let Event::Custom { payload, .. } = event {
                    for (_, handler) in &listeners {
                        invoke_isolated(handler.as_ref(), payload);
                    }
                }
            }
            Event::CommandStart { .. } | Event::CommandDone { .. } | Event::CommandError { .. } => {
                let data_id = event.data_id();
                let listeners = self.inner.lock().command.get(data_id).cloned().unwrap_or_default();
                for (_, tag, handler) in &listeners {
                    if tag.matches(event) {
                        invoke_isolated(handler.as_ref(), event);
                    }
                }
            }
            Event::InitStart { .. } | Event::InitCached { .. } | Event::InitDone { .. } | Event::InitError { .. } => {}
        }
    }

    /// Removes every per-space command and custom listener for `data_id`
    /// (§9 "must be deleted on `remove(origin)`").
    pub fn purge(&self, data_id: &DataId) {
        let mut inner = self.inner.lock();
        inner.command.remove(data_id);
        inner.custom.remove(data_id);
    }

    fn unsubscribe_global(&self, id: u64) -> Unsubscribe {
        let weak = self.self_weak.clone();
        Box::new(move || {
            if let Some(bus) = weak.upgrade() {
                bus.inner.lock().global.retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    fn unsubscribe_command(&self, data_id: DataId, id: u64) -> Unsubscribe {
        let weak = self.self_weak.clone();
        Box::new(move || {
            if let Some(bus) = weak.upgrade() {
                if let Some(listeners) = bus.inner.lock().command.get_mut(&data_id) {
                    listeners.retain(|(listener_id, _, _)| *listener_id != id);
                }
            }
        })
    }

    fn unsubscribe_custom(&self, data_id: DataId, id: u64) -> Unsubscribe {
        let weak = self.self_weak.clone();
        Box::new(move || {
            if let Some(bus) = weak.upgrade() {
                if let Some(listeners) = bus.inner.lock().custom.get_mut(&data_id) {
                    listeners.retain(|(listener_id, _)| *listener_id != id);
                }
            }
        })
    }
}

fn invoke_isolated<T: ?Sized>(handler: &(impl Fn(&T) + ?Sized), payload: &T) {
    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
}
