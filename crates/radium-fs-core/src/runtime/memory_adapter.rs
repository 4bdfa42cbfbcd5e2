// radium-fs-core/src/runtime/memory_adapter.rs
// ============================================================================
// Module: Radium-FS In-Memory Adapter
// Description: Reference Adapter backed by a process-local virtual
//              filesystem; no disk I/O.
// Purpose: Exercise the Store engine in unit/integration tests without
//          touching the real filesystem.
// Dependencies: parking_lot, globset, regex, crate::{core::hashing, interfaces}
// ============================================================================

//! ## Overview
//! A flat `HashMap<PathBuf, Node>` keyed by absolute, lexically-normalized
//! path. Symlinks are resolved on every read-path operation
//! (`read_file`/`stat`/`read_dir`/`exists`/`remove`), following up to
//! [`MAX_SYMLINK_DEPTH`] hops before reporting [`AdapterError::SymlinkLoop`]
//! (§6: "the in-memory adapter detects symlink cycles within 32 resolution
//! steps"). Write-path operations (`write_file`/`mkdir`/`symlink`/`rename`)
//! create missing ancestor directories but do not themselves traverse
//! symlinks in the path being created — this adapter's own callers
//! (`ensure`'s temp-directory builds, `dep`'s link creation) never write
//! through a mount point they just created.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use globset::Glob;
use globset::GlobSetBuilder;
use parking_lot::Mutex;
use regex::Regex;

use crate::core::hashing::hash_bytes;
use crate::interfaces::Adapter;
use crate::interfaces::AdapterError;
use crate::interfaces::GlobOptions;
use crate::interfaces::GrepMatch;
use crate::interfaces::GrepOptions;
use crate::interfaces::RemoveOptions;
use crate::interfaces::StatInfo;

/// Bound on symlink hops resolved in one path lookup (§6).
pub const MAX_SYMLINK_DEPTH: usize = 32;

#[derive(Clone)]
enum Node {
    File(Vec<u8>, i64),
    Dir(i64),
    Symlink(PathBuf),
}

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

// ============================================================================
// SECTION: MemoryAdapter
// ============================================================================

/// In-memory reference [`Adapter`].
pub struct MemoryAdapter {
    nodes: Mutex<HashMap<PathBuf, Node>>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Creates an empty virtual filesystem with just the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir(now_ms()));
        Self { nodes: Mutex::new(nodes) }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, AdapterError> {
        let normalized = normalize_lexical(path);
        let nodes = self.nodes.lock();
        Self::resolve_in(&nodes, &normalized, 0)
    }

    fn resolve_in(nodes: &HashMap<PathBuf, Node>, path: &Path, depth: usize) -> Result<PathBuf, AdapterError> {
        if depth > MAX_SYMLINK_DEPTH {
            return Err(AdapterError::SymlinkLoop(path.to_path_buf()));
        }
        let mut current = PathBuf::from("/");
        for component in path.components() {
            if matches!(component, Component::RootDir) {
                continue;
            }
            current.push(component.as_os_str());
            if let Some(Node::Symlink(target)) = nodes.get(&current) {
                let joined =
                    if target.is_absolute() { target.clone() } else { current.parent().unwrap_or(Path::new("/")).join(target) };
                let normalized_target = normalize_lexical(&joined);
                current = Self::resolve_in(nodes, &normalized_target, depth + 1)?;
            }
        }
        Ok(current)
    }

    fn ensure_parent_dirs(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        let mut current = PathBuf::from("/");
        let Some(parent) = path.parent() else { return };
        for component in parent.components() {
            if matches!(component, Component::RootDir) {
                continue;
            }
            current.push(component.as_os_str());
            nodes.entry(current.clone()).or_insert_with(|| Node::Dir(now_ms()));
        }
    }

    fn list_files_recursive(&self, root: &Path) -> Vec<PathBuf> {
        let nodes = self.nodes.lock();
        let mut out = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let prefix = dir.clone();
            for (path, node) in nodes.iter() {
                if path.parent() != Some(prefix.as_path()) {
                    continue;
                }
                match node {
                    Node::Dir(_) => stack.push(path.clone()),
                    Node::File(_, _) | Node::Symlink(_) => out.push(path.clone()),
                }
            }
        }
        out
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn hash(&self, bytes: &[u8]) -> String {
        hash_bytes(bytes)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, AdapterError> {
        let resolved = self.resolve(path)?;
        let nodes = self.nodes.lock();
        match nodes.get(&resolved) {
            Some(Node::File(bytes, _)) => Ok(bytes.clone()),
            _ => Err(AdapterError::NotFound(path.to_path_buf())),
        }
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), AdapterError> {
        let normalized = normalize_lexical(path);
        let mut nodes = self.nodes.lock();
        Self::ensure_parent_dirs(&mut nodes, &normalized);
        nodes.insert(normalized, Node::File(contents.to_vec(), now_ms()));
        Ok(())
    }

    async fn mkdir(&self, path: &Path) -> Result<(), AdapterError> {
        let normalized = normalize_lexical(path);
        let mut nodes = self.nodes.lock();
        Self::ensure_parent_dirs(&mut nodes, &normalized);
        nodes.entry(normalized).or_insert_with(|| Node::Dir(now_ms()));
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<String>, AdapterError> {
        let resolved = self.resolve(path)?;
        let nodes = self.nodes.lock();
        if !matches!(nodes.get(&resolved), Some(Node::Dir(_))) {
            return Err(AdapterError::NotFound(path.to_path_buf()));
        }
        let mut names: Vec<String> = nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(resolved.as_path()))
            .filter_map(|candidate| candidate.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn stat(&self, path: &Path) -> Result<StatInfo, AdapterError> {
        let resolved = self.resolve(path)?;
        let nodes = self.nodes.lock();
        match nodes.get(&resolved) {
            Some(Node::File(bytes, mtime)) => {
                Ok(StatInfo { is_file: true, is_directory: false, size: bytes.len() as u64, mtime_ms: *mtime })
            }
            Some(Node::Dir(mtime)) => Ok(StatInfo { is_file: false, is_directory: true, size: 0, mtime_ms: *mtime }),
            _ => Err(AdapterError::NotFound(path.to_path_buf())),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        match self.resolve(path) {
            Ok(resolved) => self.nodes.lock().contains_key(&resolved),
            Err(_) => false,
        }
    }

    async fn remove(&self, path: &Path, options: RemoveOptions) -> Result<(), AdapterError> {
        let resolved = self.resolve(path)?;
        let mut nodes = self.nodes.lock();
        let is_dir = matches!(nodes.get(&resolved), Some(Node::Dir(_)));
        if !nodes.contains_key(&resolved) {
            return Err(AdapterError::NotFound(path.to_path_buf()));
        }
        if is_dir && options.recursive {
            let doomed: Vec<PathBuf> = nodes.keys().filter(|candidate| candidate.starts_with(&resolved)).cloned().collect();
            for doomed_path in doomed {
                nodes.remove(&doomed_path);
            }
        } else {
            nodes.remove(&resolved);
        }
        Ok(())
    }

    async fn rename(&self, src: &Path, dest: &Path) -> Result<(), AdapterError> {
        let resolved_src = self.resolve(src)?;
        let normalized_dest = normalize_lexical(dest);
        let mut nodes = self.nodes.lock();
        let moved: Vec<(PathBuf, Node)> = nodes
            .iter()
            .filter(|(candidate, _)| candidate.starts_with(&resolved_src))
            .map(|(candidate, node)| (candidate.clone(), node.clone()))
            .collect();
        if moved.is_empty() {
            return Err(AdapterError::NotFound(src.to_path_buf()));
        }
        Self::ensure_parent_dirs(&mut nodes, &normalized_dest);
        for (candidate, node) in moved {
            let relative = candidate.strip_prefix(&resolved_src).unwrap_or(Path::new(""));
            let new_path = normalized_dest.join(relative);
            nodes.remove(&candidate);
            nodes.insert(new_path, node);
        }
        Ok(())
    }

    async fn symlink(&self, target: &Path, link_path: &Path) -> Result<(), AdapterError> {
        let normalized_link = normalize_lexical(link_path);
        let mut nodes = self.nodes.lock();
        Self::ensure_parent_dirs(&mut nodes, &normalized_link);
        nodes.insert(normalized_link, Node::Symlink(target.to_path_buf()));
        Ok(())
    }

    async fn glob(&self, root_dir: &Path, pattern: &str, options: GlobOptions) -> Result<Vec<String>, AdapterError> {
        let resolved_root = self.resolve(root_dir)?;
        let matcher = Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?.compile_matcher();
        let mut ignore_set = GlobSetBuilder::new();
        for pattern in &options.ignore {
            ignore_set.add(Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?);
        }
        let ignore_set = ignore_set.build().map_err(|err| AdapterError::io(root_dir, err))?;

        let mut out = Vec::new();
        for path in self.list_files_recursive(&resolved_root) {
            let Ok(relative) = path.strip_prefix(&resolved_root) else { continue };
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
        let resolved_root = self.resolve(root_dir)?;
        let regex = Regex::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?;
        let mut include_set = GlobSetBuilder::new();
        for pattern in &options.include {
            include_set.add(Glob::new(pattern).map_err(|err| AdapterError::io(root_dir, err))?);
        }
        let include_set = include_set.build().map_err(|err| AdapterError::io(root_dir, err))?;

        let mut out = Vec::new();
        let mut paths = self.list_files_recursive(&resolved_root);
        paths.sort();
        'files: for path in paths {
            let Ok(relative) = path.strip_prefix(&resolved_root) else { continue };
            if !options.include.is_empty() && !include_set.is_match(relative) {
                continue;
            }
            let Ok(bytes) = self.read_file(&path).await else { continue };
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

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[tokio::test]
    async fn write_read_round_trips() {
        let adapter = MemoryAdapter::new();
        adapter.write_file(Path::new("/a/b.txt"), b"hello").await.expect("write");
        let contents = adapter.read_file(Path::new("/a/b.txt")).await.expect("read");
        assert_eq!(contents, b"hello");
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = adapter.read_file(Path::new("/missing")).await.unwrap_err();
        assert!(matches!(err, AdapterError::NotFound(_)));
    }

    #[tokio::test]
    async fn symlink_resolves_transparently() {
        let adapter = MemoryAdapter::new();
        adapter.write_file(Path::new("/real/file.txt"), b"x").await.expect("write");
        adapter.symlink(Path::new("/real"), Path::new("/link")).await.expect("symlink");
        let contents = adapter.read_file(Path::new("/link/file.txt")).await.expect("read through link");
        assert_eq!(contents, b"x");
    }

    #[tokio::test]
    async fn self_referential_symlink_reports_loop() {
        let adapter = MemoryAdapter::new();
        adapter.symlink(Path::new("/loop"), Path::new("/loop")).await.expect("symlink");
        let err = adapter.read_file(Path::new("/loop/x")).await.unwrap_err();
        assert!(matches!(err, AdapterError::SymlinkLoop(_)));
    }

    #[tokio::test]
    async fn remove_recursive_drops_nested_entries() {
        let adapter = MemoryAdapter::new();
        adapter.write_file(Path::new("/dir/nested.txt"), b"x").await.expect("write");
        adapter.remove(Path::new("/dir"), RemoveOptions { recursive: true }).await.expect("remove");
        assert!(!adapter.exists(Path::new("/dir/nested.txt")).await);
    }

    #[tokio::test]
    async fn glob_matches_relative_to_root() {
        let adapter = MemoryAdapter::new();
        adapter.write_file(Path::new("/root/a.txt"), b"x").await.expect("write");
        adapter.write_file(Path::new("/root/b.rs"), b"x").await.expect("write");
        let matches = adapter.glob(Path::new("/root"), "*.txt", GlobOptions::default()).await.expect("glob");
        assert_eq!(matches, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn grep_finds_matching_lines() {
        let adapter = MemoryAdapter::new();
        adapter.write_file(Path::new("/root/a.txt"), b"hello\nworld\n").await.expect("write");
        let matches = adapter.grep(Path::new("/root"), "wor.d", GrepOptions::default()).await.expect("grep");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line, 2);
    }
}
