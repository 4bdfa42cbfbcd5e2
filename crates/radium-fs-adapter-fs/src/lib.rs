// radium-fs-adapter-fs/src/lib.rs
// ============================================================================
// Module: Radium-FS Native Filesystem Adapter
// Description: Production `Adapter` implementation backed by real OS
//              filesystem primitives.
// Purpose: Let a `Store` persist Spaces under an actual directory tree
//          instead of the in-process `MemoryAdapter`.
// Dependencies: tokio, async-trait, globset, regex, radium-fs-core
// ============================================================================

//! ## Overview
//! [`FsAdapter`] is a thin, stateless wrapper over `tokio::fs`: every method
//! takes an absolute [`Path`] and performs exactly one filesystem operation
//! (plus parent-directory creation where the trait contract requires it).
//! `glob`/`grep` walk the tree under `root_dir` with a small recursive
//! helper, since `tokio::fs` has no built-in recursive listing, then apply
//! the same `globset`/`regex` matching [`radium_fs_core::runtime::memory_adapter::MemoryAdapter`]
//! uses so the two adapters agree on match semantics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use globset::Glob;
use globset::GlobSetBuilder;
use radium_fs_core::Adapter;
use radium_fs_core::AdapterError;
use radium_fs_core::GlobOptions;
use radium_fs_core::GrepMatch;
use radium_fs_core::GrepOptions;
use radium_fs_core::RemoveOptions;
use radium_fs_core::StatInfo;
use radium_fs_core::hash_bytes;
use regex::Regex;

// ============================================================================
// SECTION: FsAdapter
// ============================================================================

/// Native-filesystem reference [`Adapter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAdapter;

impl FsAdapter {
    /// Constructs an adapter with no held state; every call re-touches the
    /// real filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(path: &Path) -> Result<(), AdapterError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| AdapterError::io(parent, err))?;
        }
        Ok(())
    }

    fn not_found_or_io(path: &Path, err: std::io::Error) -> AdapterError {
        if err.kind() == std::io::ErrorKind::NotFound {
            AdapterError::NotFound(path.to_path_buf())
        } else {
            AdapterError::io(path, err)
        }
    }

    async fn walk_files(root: &Path) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else { continue };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let Ok(file_type) = entry.file_type().await else { continue };
                if file_type.is_dir() {
                    stack.push(path);
                } else {
                    out.push(path);
                }
            }
        }
        out
    }
}

#[async_trait]
impl Adapter for FsAdapter {
    fn hash(&self, bytes: &[u8]) -> String {
        hash_bytes(bytes)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, AdapterError> {
        tokio::fs::read(path).await.map_err(|err| Self::not_found_or_io(path, err))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), AdapterError> {
        Self::ensure_parent(path).await?;
        tokio::fs::write(path, contents).await.map_err(|err| AdapterError::io(path, err))
    }

    async fn mkdir(&self, path: &Path) -> Result<(), AdapterError> {
        tokio::fs::create_dir_all(path).await.map_err(|err| AdapterError::io(path, err))
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, AdapterError> {
        let mut entries = tokio::fs::read_dir(path).await.map_err(|err| Self::not_found_or_io(path, err))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| AdapterError::io(path, err))? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> Result<StatInfo, AdapterError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|err| Self::not_found_or_io(path, err))?;
        let mtime_ms = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
        Ok(StatInfo {
            is_file: metadata.is_file(),
            is_directory: metadata.is_dir(),
            size: metadata.len(),
            mtime_ms,
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn remove(&self, path: &Path, options: RemoveOptions) -> Result<(), AdapterError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|err| Self::not_found_or_io(path, err))?;
        if metadata.is_dir() {
            if options.recursive {
                tokio::fs::remove_dir_all(path).await.map_err(|err| AdapterError::io(path, err))
            } else {
                tokio::fs::remove_dir(path).await.map_err(|err| AdapterError::io(path, err))
            }
        } else {
            tokio::fs::remove_file(path).await.map_err(|err| AdapterError::io(path, err))
        }
    }

    async fn rename(&self, src: &Path, dest: &Path) -> Result<(), AdapterError> {
        Self::ensure_parent(dest).await?;
        tokio::fs::rename(src, dest).await.map_err(|err| Self::not_found_or_io(src, err))
    }

    async fn symlink(&self, target: &Path, link_path: &Path) -> Result<(), AdapterError> {
        Self::ensure_parent(link_path).await?;
        #[cfg(unix)]
        {
            tokio::fs::symlink(target, link_path).await.map_err(|err| AdapterError::io(link_path, err))
        }
        #[cfg(windows)]
        {
            let points_at_dir = tokio::fs::metadata(link_path.parent().unwrap_or(link_path).join(target))
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(true);
            if points_at_dir {
                tokio::fs::symlink_dir(target, link_path).await.map_err(|err| AdapterError::io(link_path, err))
            } else {
                tokio::fs::symlink_file(target, link_path).await.map_err(|err| AdapterError::io(link_path, err))
            }
        }
    }

    async fn glob(&self, root_dir: &Path, pattern: &str, options: GlobOptions) -> Result<Vec<String>, AdapterError> {
        let matcher = Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?.compile_matcher();
        let mut ignore_set = GlobSetBuilder::new();
        for pattern in &options.ignore {
            ignore_set.add(Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?);
        }
        let ignore_set = ignore_set.build().map_err(|err| AdapterError::io(root_dir, err))?;

        let mut out = Vec::new();
        for path in Self::walk_files(root_dir).await {
            let Ok(relative) = path.strip_prefix(root_dir) else { continue };
            if !matcher.is_match(relative) || ignore_set.is_match(relative) {
                continue;
            }
            out.push(relative.to_string_lossy().into_owned());
            if let Some(max) = options.max_results {
                if out.len() >= max {
                    break;
                }
            }
        }
        out.sort();
        Ok(out)
    }

    async fn grep(&self, root_dir: &Path, pattern: &str, options: GrepOptions) -> Result<Vec<GrepMatch>, AdapterError> {
        let regex = Regex::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?;
        let mut include_set = GlobSetBuilder::new();
        for pattern in &options.include {
            include_set.add(Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?);
        }
        let include_set = include_set.build().map_err(|err| AdapterError::io(root_dir, err))?;

        let mut out = Vec::new();
        let mut paths = Self::walk_files(root_dir).await;
        paths.sort();
        'files: for path in paths {
            let Ok(relative) = path.strip_prefix(root_dir) else { continue };
            if !options.include.is_empty() && !include_set.is_match(relative) {
                continue;
            }
            let Ok(bytes) = tokio::fs::read(&path).await else { continue };
            let Ok(text) = String::from_utf8(bytes) else { continue };
            for (index, line) in text.split('\n').enumerate() {
                if regex.is_match(line) {
                    out.push(GrepMatch {
                        relative_path: relative.to_string_lossy().into_owned(),
                        line: (index + 1) as u64,
                        content: line.to_string(),
                    });
                    if let Some(max) = options.max_results {
                        if out.len() >= max {
                            break 'files;
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn write_read_round_trips() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        let path = dir.path().join("a/b.txt");
        adapter.write_file(&path, b"hello").await.expect("write");
        let contents = adapter.read_file(&path).await.expect("read");
        assert_eq!(contents, b"hello");
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        let err = adapter.read_file(&dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));
    }

    #[tokio::test]
    async fn symlink_resolves_transparently() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        let real = dir.path().join("real");
        adapter.mkdir(&real).await.expect("mkdir");
        adapter.write_file(&real.join("file.txt"), b"x").await.expect("write");
        let link = dir.path().join("link");
        adapter.symlink(&real, &link).await.expect("symlink");
        let contents = adapter.read_file(&link.join("file.txt")).await.expect("read through link");
        assert_eq!(contents, b"x");
    }

    #[tokio::test]
    async fn remove_recursive_drops_nested_entries() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        let nested = dir.path().join("dir/nested.txt");
        adapter.write_file(&nested, b"x").await.expect("write");
        adapter.remove(&dir.path().join("dir"), RemoveOptions { recursive: true }).await.expect("remove");
        assert!(!adapter.exists(&nested).await);
    }

    #[tokio::test]
    async fn glob_matches_relative_to_root() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        adapter.write_file(&dir.path().join("a.txt"), b"x").await.expect("write");
        adapter.write_file(&dir.path().join("b.rs"), b"x").await.expect("write");
        let matches = adapter.glob(dir.path(), "*.txt", GlobOptions::default()).await.expect("glob");
        assert_eq!(matches, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn grep_finds_matching_lines() {
        let dir = tempdir().expect("tempdir");
        let adapter = FsAdapter::new();
        adapter.write_file(&dir.path().join("a.txt"), b"hello\nworld\n").await.expect("write");
        let matches = adapter.grep(dir.path(), "wor.d", GrepOptions::default()).await.expect("grep");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, 2);
    }
}
