// radium-fs-core/src/interfaces/mod.rs
// ============================================================================
// Module: Radium-FS Interfaces
// Description: Platform boundary the Store engine consumes: the Adapter
//              (filesystem I/O + SHA-256) and the optional Locker.
// Purpose: Decouple the engine from any one filesystem or lock backend.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! Everything the engine knows about the outside world goes through
//! [`Adapter`]. Two reference implementations ship alongside this trait:
//! [`crate::runtime::memory_adapter::MemoryAdapter`] (in-process, used by
//! tests) and the native-filesystem adapter in the sibling
//! `radium-fs-adapter-fs` crate. The engine never matches on adapter error
//! variants beyond "does this path exist" — see [`AdapterError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::runtime::cancel::CancelSignal;

// ============================================================================
// SECTION: Adapter — supporting types
// ============================================================================

/// Result of `stat`, following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    /// Whether the path names a regular file.
    pub is_file: bool,
    /// Whether the path names a directory.
    pub is_directory: bool,
    /// Size in bytes; `0` for directories.
    pub size: u64,
    /// Modification time, milliseconds since the Unix epoch.
    pub mtime_ms: i64,
}

/// Options for [`Adapter::remove`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Remove directories and their contents recursively.
    pub recursive: bool,
}

/// Options for [`Adapter::glob`].
#[derive(Debug, Clone, Default)]
pub struct GlobOptions {
    /// Glob patterns whose matches are excluded from the result.
    pub ignore: Vec<String>,
    /// Caps the number of returned paths; `None` means unbounded.
    pub max_results: Option<usize>,
}

/// Options for [`Adapter::grep`].
#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    /// Glob patterns a file's relative path must match to be searched.
    pub include: Vec<String>,
    /// Caps the number of returned matches; `None` means unbounded.
    pub max_results: Option<usize>,
}

/// One `grep` hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepMatch {
    /// Path relative to the search root.
    pub relative_path: String,
    /// 1-based line number within the file.
    pub line: u64,
    /// The matching line's text, without the trailing newline.
    pub content: String,
}

impl GrepMatch {
    /// Formats as `"relpath:line:content"` (§4.2).
    #[must_use]
    pub fn to_line(&self) -> String {
        format!("{}:{}:{}", self.relative_path, self.line, self.content)
    }
}

/// Errors an [`Adapter`] may raise. The engine only ever distinguishes
/// `NotFound` from every other variant (§4.2: "the engine never interprets
/// error codes beyond the path exists / doesn't exist").
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The path does not exist where one was required.
    #[error("not found: {0}")]
    NotFound(PathBuf),
    /// A symlink resolution exceeded the loop-detection depth (§6, in-memory
    /// adapter: 32 steps).
    #[error("symlink loop detected at {0}")]
    SymlinkLoop(PathBuf),
    /// Any other I/O failure, carried unchanged from the underlying backend.
    #[error("adapter I/O error at {path}: {source}")]
    Io {
        /// Path the operation was attempted against.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AdapterError {
    /// Constructs an [`AdapterError::Io`] from any boxed error.
    pub fn io(path: impl Into<PathBuf>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io { path: path.into(), source: Box::new(source) }
    }
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Platform I/O + SHA-256 boundary the engine consumes for every filesystem
/// interaction (§4.2). Inputs are absolute paths unless a method says
/// otherwise.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Hashes `bytes` with SHA-256, returning 64 lowercase hex characters.
    fn hash(&self, bytes: &[u8]) -> String;

    /// Reads the full contents of a file. Fails with
    /// [`AdapterError::NotFound`] if missing.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, AdapterError>;

    /// Writes `contents`, creating parent directories as needed.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), AdapterError>;

    /// Creates a directory and all missing parents; idempotent.
    async fn mkdir(&self, path: &Path) -> Result<(), AdapterError>;

    /// Lists entry names directly under `path`, following a symlink on
    /// `path` itself.
    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, AdapterError>;

    /// Returns metadata about `path`, following symlinks.
    async fn stat(&self, path: &Path) -> Result<StatInfo, AdapterError>;

    /// Returns whether `path` exists. Never errors; a symlink loop reports
    /// `false`.
    async fn exists(&self, path: &Path) -> bool;

    /// Removes a file or (optionally recursively) a directory.
    async fn remove(&self, path: &Path, options: RemoveOptions) -> Result<(), AdapterError>;

    /// Atomically moves `src` to `dest`, creating `dest`'s parent
    /// directories as needed.
    async fn rename(&self, src: &Path, dest: &Path) -> Result<(), AdapterError>;

    /// Creates a symlink at `link_path` pointing at `target` (which may be
    /// relative), creating `link_path`'s parent directories as needed.
    async fn symlink(&self, target: &Path, link_path: &Path) -> Result<(), AdapterError>;

    /// Returns paths (relative to `root_dir`) matching `pattern`.
    async fn glob(&self, root_dir: &Path, pattern: &str, options: GlobOptions) -> Result<Vec<String>, AdapterError>;

    /// Returns matches for `pattern` (a regular expression) across files
    /// under `root_dir`.
    async fn grep(&self, root_dir: &Path, pattern: &str, options: GrepOptions) -> Result<Vec<GrepMatch>, AdapterError>;
}

// ============================================================================
// SECTION: Locker
// ============================================================================

/// Advisory exclusive lock keyed by an opaque string (in practice, a
/// [`crate::core::identifiers::DataId`]). The engine never inspects lock
/// holders (§5).
#[async_trait]
pub trait Locker: Send + Sync {
    /// Acquires the lock for `key`, suspending until available or until
    /// `signal` fires.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Aborted`] if `signal` fires before acquisition.
    async fn acquire(&self, key: &str, signal: &CancelSignal) -> Result<Box<dyn LockHandle>, LockError>;
}

/// A held lock. The engine always releases on every exit path (§4.5.1 step
/// 2), success or failure alike.
#[async_trait]
pub trait LockHandle: Send + Sync {
    /// Releases the lock.
    async fn release(self: Box<Self>);
}

/// Errors a [`Locker`] may raise.
#[derive(Debug, Error)]
pub enum LockError {
    /// The signal fired before the lock was acquired.
    #[error("aborted while waiting for lock")]
    Aborted,
    /// Any other backend-specific failure.
    #[error("lock backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
