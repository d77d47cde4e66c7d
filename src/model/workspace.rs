use std::path::{Path, PathBuf};

use super::config::WorkspaceConfig;
use super::node::TreeNode;

/// Name of the metadata directory at the workspace root
pub const META_DIR: &str = ".notetree";

/// A loaded note workspace
#[derive(Debug)]
pub struct Workspace {
    /// Directory holding the notes (parent of `.notetree/`)
    pub root: PathBuf,
    /// Path to the `.notetree/` directory
    pub meta_dir: PathBuf,
    /// Parsed config.toml
    pub config: WorkspaceConfig,
    /// Current projection of the directory tree
    pub tree: Vec<TreeNode>,
}

/// Resolve a `/`-separated key under `root`.
pub fn key_to_path(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}
