// radium-fs-core/src/core/kind.rs
// ============================================================================
// Module: Radium-FS Kind
// Description: Immutable recipe type: name, optional cacheKey projection,
//              required async initializer, optional async command handler.
// Purpose: Let callers register recipes once at program start and hand them
//          to the Store engine by reference for every `ensure`/`send` call.
// Dependencies: serde, crate::runtime::{build_api, error}
// ============================================================================

//! ## Overview
//! A [`Kind<I>`] is created once, at registration time, and never destroyed
//! (§3 Lifecycles). It is generic over its input type `I` so a given Kind's
//! `onInit`/`onCommand`/`cacheKey` all agree on one concrete Rust type,
//! while the engine itself (`crate::runtime::engine::Store`) stays
//! non-generic: every Kind-specific value crosses the engine boundary
//! already converted to `serde_json::Value` (the manifest's `origin.input`
//! and `cacheKey`, per §3).
//!
//! `onInit`/`onCommand` are boxed-future-returning closures rather than
//! `async fn` in a trait: a `Kind` must be storable by value in caller-owned
//! registries and passed across the recursive `dep()` boundary, which rules
//! out `async fn` in a (non-object-safe) trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::KindName;
use crate::runtime::build_api::CommandContext;
use crate::runtime::build_api::InitContext;
use crate::runtime::error::BoxError;
use crate::runtime::error::StoreError;

/// A boxed future, the standard object-safe stand-in for `async fn` in a
/// stored closure (§4.5's "every externally visible operation is a
/// suspension point").
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// What an export map normalizes from, per §4.5.1 step 9a: absent, a bare
/// string (shorthand for the default export), or a full map.
#[derive(Debug, Clone)]
pub enum ExportsOutcome {
    /// `onInit`/`onCommand` returned no `exports` field; normalizes to
    /// `{".": "."}`.
    Default,
    /// A bare string `s`; normalizes to `{".": s}`.
    Single(String),
    /// An explicit export map.
    Map(BTreeMap<String, String>),
}

impl ExportsOutcome {
    /// Normalizes to the full export map, always containing `"."` (§3
    /// Invariants).
    #[must_use]
    pub fn normalize(self) -> BTreeMap<String, String> {
        match self {
            Self::Default => BTreeMap::from([(".".to_string(), ".".to_string())]),
            Self::Single(path) => BTreeMap::from([(".".to_string(), path)]),
            Self::Map(mut map) => {
                map.entry(".".to_string()).or_insert_with(|| ".".to_string());
                map
            }
        }
    }
}

impl Default for ExportsOutcome {
    fn default() -> Self {
        Self::Default
    }
}

impl From<String> for ExportsOutcome {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<BTreeMap<String, String>> for ExportsOutcome {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self::Map(value)
    }
}

/// What `onInit` returns on success (§4.5.1 step 9).
#[derive(Debug, Clone, Default)]
pub struct InitOutcome {
    /// Export map, before normalization.
    pub exports: ExportsOutcome,
    /// Opaque metadata; defaults to empty.
    pub metadata: BTreeMap<String, Value>,
}

/// What `onCommand` returns on success (§4.5.3 step 5). Both fields are
/// optional; absence means "keep the manifest's existing value".
#[derive(Debug, Clone, Default)]
pub struct CommandOutcome {
    /// Replacement export map, if the command changed it.
    pub exports: Option<BTreeMap<String, String>>,
    /// Replacement metadata map, if the command changed it.
    pub metadata: Option<BTreeMap<String, Value>>,
}

// ============================================================================
// SECTION: Closure Types
// ============================================================================

type CacheKeyFn<I> = dyn Fn(&I) -> Value + Send + Sync;
type OnInitFn<I> = dyn Fn(InitContext, I) -> BoxFuture<'static, Result<InitOutcome, BoxError>> + Send + Sync;

/// Type-erased command handler. Unlike `onInit`, this never depends on the
/// Kind's input type `I` — `send(command)` takes a freestanding
/// `serde_json::Value` — so a [`crate::runtime::space::Space`] can carry a
/// handle to it without itself being generic over `I`.
pub(crate) type OnCommandFn = dyn Fn(CommandContext) -> BoxFuture<'static, Result<CommandOutcome, BoxError>> + Send + Sync;

// ============================================================================
// SECTION: Kind
// ============================================================================

/// An immutable recipe: a named pair of an initializer and an optional
/// command handler (§3 Data Model).
pub struct Kind<I> {
    name: KindName,
    cache_key: Option<Arc<CacheKeyFn<I>>>,
    on_init: Arc<OnInitFn<I>>,
    on_command: Option<Arc<OnCommandFn>>,
}

impl<I> Clone for Kind<I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            cache_key: self.cache_key.clone(),
            on_init: Arc::clone(&self.on_init),
            on_command: self.on_command.clone(),
        }
    }
}

impl<I> Kind<I>
where
    I: Serialize + Send + Sync + 'static,
{
    /// Declares a new Kind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if `name` is empty (§7
    /// ValidationError: "a Kind was declared without a non-empty name or
    /// without an initializer"). The initializer itself is required by the
    /// type signature, so the only other half of that rule is enforced at
    /// compile time.
    pub fn new<Name, F, Fut>(name: Name, on_init: F) -> Result<Self, StoreError>
    where
        Name: Into<String>,
        F: Fn(InitContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<InitOutcome, BoxError>> + Send + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StoreError::Validation("kind name must not be empty".to_string()));
        }
        Ok(Self {
            name: KindName::new(name),
            cache_key: None,
            on_init: Arc::new(move |ctx, input| Box::pin(on_init(ctx, input))),
            on_command: None,
        })
    }

    /// Attaches a `cacheKey` projection: a pure function narrowing `input`
    /// to the subset that actually determines identity (§3, §4.3).
    #[must_use]
    pub fn with_cache_key<F>(mut self, cache_key: F) -> Self
    where
        F: Fn(&I) -> Value + Send + Sync + 'static,
    {
        self.cache_key = Some(Arc::new(cache_key));
        self
    }

    /// Attaches a command handler, making `send` available on spaces this
    /// Kind produces (§4.5.3).
    #[must_use]
    pub fn with_command<F, Fut>(mut self, on_command: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CommandOutcome, BoxError>> + Send + 'static,
    {
        self.on_command = Some(Arc::new(move |ctx| Box::pin(on_command(ctx))));
        self
    }

    /// The name this Kind registers under.
    #[must_use]
    pub fn name(&self) -> &KindName {
        &self.name
    }

    /// Whether this Kind supports `send` (has an `onCommand` handler).
    #[must_use]
    pub fn has_command(&self) -> bool {
        self.on_command.is_some()
    }

    /// Computes `cacheKey(input) ?? input` as a `serde_json::Value`, the
    /// value §4.3's canonicalization and hashing operate on.
    #[must_use]
    pub fn effective_cache_key(&self, input: &I) -> Value {
        match &self.cache_key {
            Some(projection) => projection(input),
            None => serde_json::to_value(input).unwrap_or(Value::Null),
        }
    }

    /// Invokes `onInit` with the bound build context.
    pub(crate) fn run_init(&self, ctx: InitContext, input: I) -> BoxFuture<'static, Result<InitOutcome, BoxError>> {
        (self.on_init)(ctx, input)
    }

    /// Invokes `onCommand`, if this Kind has one.
    pub(crate) fn run_command(&self, ctx: CommandContext) -> Option<BoxFuture<'static, Result<CommandOutcome, BoxError>>> {
        self.on_command.as_ref().map(|handler| handler(ctx))
    }

    /// Returns a type-erased clone of the command handler, if any, so a
    /// [`crate::runtime::space::Space`] can carry `send` capability without
    /// borrowing this `Kind`.
    pub(crate) fn command_handler(&self) -> Option<Arc<OnCommandFn>> {
        self.on_command.clone()
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

    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct SampleInput {
        name: String,
        debug: bool,
    }

    #[test]
    fn rejects_empty_name() {
        let result = Kind::<SampleInput>::new("   ", |_ctx, _input| async { Ok(InitOutcome::default()) });
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn effective_cache_key_defaults_to_whole_input() {
        let kind =
            Kind::<SampleInput>::new("k", |_ctx, _input| async { Ok(InitOutcome::default()) }).expect("valid kind");
        let input = SampleInput { name: "a".to_string(), debug: true };
        assert_eq!(kind.effective_cache_key(&input), json!({"name": "a", "debug": true}));
    }

    #[test]
    fn cache_key_projection_narrows_input() {
        let kind = Kind::<SampleInput>::new("k", |_ctx, _input| async { Ok(InitOutcome::default()) })
            .expect("valid kind")
            .with_cache_key(|input: &SampleInput| json!({"name": input.name}));
        let input = SampleInput { name: "a".to_string(), debug: true };
        assert_eq!(kind.effective_cache_key(&input), json!({"name": "a"}));
    }

    #[test]
    fn has_command_reflects_builder() {
        let without = Kind::<SampleInput>::new("k", |_ctx, _input| async { Ok(InitOutcome::default()) }).expect("valid");
        assert!(!without.has_command());
        let with = without.with_command(|_ctx| async { Ok(CommandOutcome::default()) });
        assert!(with.has_command());
    }
}
