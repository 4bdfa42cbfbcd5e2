// radium-fs-core/src/runtime/layout.rs
// ============================================================================
// Module: Radium-FS Layout
// Description: Pure path arithmetic over a DataId: shard, data directory,
//              temp directory naming, content/private subpaths, and the
//              relative-symlink-target computation.
// Purpose: Keep every on-disk path decision in one place, independent of any
//          Adapter, so it can be unit tested without touching a filesystem.
// Dependencies: crate::core::identifiers
// ============================================================================

//! ## Overview
//! Implements §4.3 and the on-disk layout contract of §6. Every function
//! here is a pure function of paths and identifiers; none of them perform
//! I/O. [`crate::runtime::engine::Store`] is the only caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::core::identifiers::DataId;
use crate::core::identifiers::KindName;

/// Name of the shared data tree directory under a store root.
pub const DATA_DIR_NAME: &str = ".radium-fs-data";
/// Name of a space's private local-dependency subtree.
pub const LOCAL_DEPS_DIR_NAME: &str = ".radium-fs-local-deps";
/// Name of the public content directory inside a data directory.
pub const CONTENT_DIR_NAME: &str = "space";
/// Name of the private directory inside a data directory.
pub const PRIVATE_DIR_NAME: &str = "local";
/// Name of the manifest sidecar file inside a data directory.
pub const MANIFEST_FILE_NAME: &str = ".radium-fs-manifest.json";
/// Prefix every temp directory name begins with; filtered out by `list`.
pub const TEMP_PREFIX: &str = ".tmp-";

// ============================================================================
// SECTION: Data directory resolution
// ============================================================================

/// The shared data directory for `(kind, id)` under `store_root`.
#[must_use]
pub fn shared_data_dir(store_root: &Path, kind: &KindName, id: &DataId) -> PathBuf {
    store_root.join(DATA_DIR_NAME).join(kind.as_str()).join(id.shard()).join(id.as_str())
}

/// The local-scoped data directory for `(kind, id)` whose parent's data
/// directory is `parent_data_dir`.
#[must_use]
pub fn local_data_dir(parent_data_dir: &Path, kind: &KindName, id: &DataId) -> PathBuf {
    parent_data_dir.join(LOCAL_DEPS_DIR_NAME).join(kind.as_str()).join(id.shard()).join(id.as_str())
}

/// Resolves the data directory for `(kind, id)`, taking the parent-local-deps
/// anchor into account (§4.5.1 step 1).
#[must_use]
pub fn data_dir(store_root: &Path, kind: &KindName, id: &DataId, local_anchor: Option<&Path>) -> PathBuf {
    match local_anchor {
        Some(parent) => local_data_dir(parent, kind, id),
        None => shared_data_dir(store_root, kind, id),
    }
}

// ============================================================================
// SECTION: Temp directory
// ============================================================================

/// Builds the name of a temp directory: `.tmp-<dataId>-<randSuffix>`.
#[must_use]
pub fn temp_dir_name(id: &DataId, rand_suffix: &str) -> String {
    format!("{TEMP_PREFIX}{id}-{rand_suffix}")
}

/// The absolute temp directory path, a sibling of `data_dir`.
///
/// # Panics
///
/// Panics if `data_dir` has no parent, which cannot happen for any path this
/// module itself produces (a data directory is always at least three levels
/// below a store root or local-deps anchor).
#[must_use]
pub fn temp_dir(data_dir: &Path, id: &DataId, rand_suffix: &str) -> PathBuf {
    let parent = data_dir.parent().expect("data directory always has a shard-dir parent");
    parent.join(temp_dir_name(id, rand_suffix))
}

/// Whether a directory-entry name is a transient temp directory, to be
/// filtered out by `list` and ignored by anything scanning a shard directory.
#[must_use]
pub fn is_temp_entry_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

// ============================================================================
// SECTION: Fixed subpaths
// ============================================================================

/// The content directory (`space/`) inside a data directory.
#[must_use]
pub fn content_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(CONTENT_DIR_NAME)
}

/// The private directory (`local/`) inside a data directory.
#[must_use]
pub fn private_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(PRIVATE_DIR_NAME)
}

/// The manifest sidecar path inside a data directory.
#[must_use]
pub fn manifest_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MANIFEST_FILE_NAME)
}

// ============================================================================
// SECTION: Relative symlink target
// ============================================================================

/// Computes the relative path a symlink at `link_path` should store to reach
/// `target_path`, by common-prefix elimination over path components (§4.3).
///
/// An empty result (link and target resolve to the same directory) collapses
/// to `"."`.
#[must_use]
pub fn relative_symlink_target(link_path: &Path, target_path: &Path) -> PathBuf {
    let link_dir = link_path.parent().unwrap_or_else(|| Path::new("."));
    relative_from(link_dir, target_path)
}

fn relative_from(from_dir: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();

    let mut common = 0;
    while common < from.len() && common < to.len() && from[common] == to[common] {
        common += 1;
    }

    let mut result = PathBuf::new();
    for _ in common .. from.len() {
        result.push("..");
    }
    for component in &to[common ..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() { PathBuf::from(".") } else { result }
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

    fn id(hex_pair_repeated: &str) -> DataId {
        DataId::parse(hex_pair_repeated.repeat(32)).expect("valid test id")
    }

    #[test]
    fn shared_data_dir_matches_layout_contract() {
        let root = Path::new("/store");
        let kind = KindName::from("greeting");
        let data_id = id("ab");
        let dir = shared_data_dir(root, &kind, &data_id);
        assert_eq!(dir, PathBuf::from("/store/.radium-fs-data/greeting/ab").join(data_id.as_str()));
    }

    #[test]
    fn local_data_dir_nests_under_parent() {
        let parent = PathBuf::from("/store/.radium-fs-data/app/12/deadbeef");
        let kind = KindName::from("config");
        let data_id = id("cd");
        let dir = local_data_dir(&parent, &kind, &data_id);
        assert!(dir.starts_with(&parent));
        assert!(dir.ends_with(data_id.as_str()));
    }

    #[test]
    fn temp_dir_name_begins_with_prefix_and_is_filtered() {
        let data_id = id("ef");
        let name = temp_dir_name(&data_id, "abcd1234");
        assert!(name.starts_with(".tmp-"));
        assert!(is_temp_entry_name(&name));
        assert!(!is_temp_entry_name(data_id.as_str()));
    }

    #[test]
    fn relative_symlink_target_eliminates_common_prefix() {
        let link = Path::new("/store/.radium-fs-data/app/aa/1/space/config");
        let target = Path::new("/store/.radium-fs-data/config/bb/2/space");
        let rel = relative_symlink_target(link, target);
        assert_eq!(rel, PathBuf::from("../../../../config/bb/2/space"));
    }

    #[test]
    fn relative_symlink_target_collapses_to_dot_when_same_dir() {
        let link = Path::new("/store/space/link");
        let target = Path::new("/store/space");
        let rel = relative_symlink_target(link, target);
        assert_eq!(rel, PathBuf::from("."));
    }
}
