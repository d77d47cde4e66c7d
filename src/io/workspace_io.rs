use std::fs;
use std::path::{Path, PathBuf};

use crate::io::state::read_view_state;
use crate::model::config::WorkspaceConfig;
use crate::model::node::{TreeNode, join_key};
use crate::model::workspace::{META_DIR, Workspace};
use crate::ops::tree_ops::apply_order;

/// Error type for workspace I/O operations
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("not a notetree workspace: no .notetree/config.toml found")]
    NotAWorkspace,
    #[error("workspace already initialized at {0}")]
    AlreadyInitialized(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not edit config.toml: {0}")]
    ConfigEditError(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidConfigValue { key: String, reason: String },
    #[error("could not serialize config.toml: {0}")]
    ConfigSerializeError(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Walk up from `start` looking for a directory containing `.notetree/config.toml`.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(META_DIR).join("config.toml").is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(WorkspaceError::NotAWorkspace);
        }
    }
}

/// Create `.notetree/config.toml` under `root`.
pub fn init_workspace(root: &Path, config: &WorkspaceConfig) -> Result<PathBuf, WorkspaceError> {
    init_workspace_with_text(root, &toml::to_string(config)?)
}

/// Create `.notetree/` with the given config.toml text, which must parse.
pub fn init_workspace_with_text(root: &Path, config_text: &str) -> Result<PathBuf, WorkspaceError> {
    toml::from_str::<WorkspaceConfig>(config_text)?;
    let meta_dir = root.join(META_DIR);
    let config_path = meta_dir.join("config.toml");
    if config_path.exists() {
        return Err(WorkspaceError::AlreadyInitialized(root.to_path_buf()));
    }
    fs::create_dir_all(meta_dir.join("trash"))?;
    fs::write(&config_path, config_text)?;
    tracing::info!(root = %root.display(), "workspace initialized");
    Ok(meta_dir)
}

/// Read and parse `.notetree/config.toml`.
pub fn read_workspace_config(meta_dir: &Path) -> Result<WorkspaceConfig, WorkspaceError> {
    let path = meta_dir.join("config.toml");
    let text = fs::read_to_string(&path).map_err(|source| WorkspaceError::ReadError {
        path: path.clone(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Load a workspace: config, directory tree, and any recorded manual ordering.
pub fn load_workspace(root: &Path) -> Result<Workspace, WorkspaceError> {
    let meta_dir = root.join(META_DIR);
    if !meta_dir.is_dir() {
        return Err(WorkspaceError::NotAWorkspace);
    }
    let config = read_workspace_config(&meta_dir)?;
    let mut tree = scan_tree(root, &config.notes.extension)?;
    if let Some(state) = read_view_state(&meta_dir) {
        apply_order(&mut tree, &state.order);
    }
    tracing::debug!(root = %root.display(), "workspace loaded");

    Ok(Workspace {
        root: root.to_path_buf(),
        meta_dir,
        config,
        tree,
    })
}

/// Project the directory under `root` into a tree.
///
/// Hidden entries and symlinks are skipped, only files with `extension`
/// become notes, folders sort before notes, and each group sorts
/// case-insensitively by title.
pub fn scan_tree(root: &Path, extension: &str) -> Result<Vec<TreeNode>, WorkspaceError> {
    scan_dir(root, "", extension)
}

fn scan_dir(dir: &Path, key_prefix: &str, extension: &str) -> Result<Vec<TreeNode>, WorkspaceError> {
    let entries = fs::read_dir(dir).map_err(|source| WorkspaceError::ReadError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut folders = Vec::new();
    let mut notes = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            tracing::warn!(path = %path.display(), "skipping entry with non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        // file_type does not follow links; a linked folder would alias keys
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            tracing::debug!(path = %path.display(), "skipping symlink");
            continue;
        }

        let key = join_key(key_prefix, &name);
        if file_type.is_dir() {
            let children = scan_dir(&path, &key, extension)?;
            folders.push(TreeNode::folder(key, name, children));
        } else if file_type.is_file()
            && let Some(title) = note_title(&name, extension)
        {
            notes.push(TreeNode::leaf(key, title));
        }
    }

    let by_title = |a: &TreeNode, b: &TreeNode| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.key.cmp(&b.key))
    };
    folders.sort_by(by_title);
    notes.sort_by(by_title);
    folders.extend(notes);
    Ok(folders)
}

/// Title for a note file name, or None if it is not a note.
pub fn note_title(file_name: &str, extension: &str) -> Option<String> {
    if extension.is_empty() {
        return Some(file_name.to_string());
    }
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::state::{ViewState, write_view_state};
    use crate::ops::tree_ops::collect_keys;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_workspace(root: &Path) {
        init_workspace(root, &WorkspaceConfig::named("test")).unwrap();
        fs::create_dir_all(root.join("Work/archive")).unwrap();
        fs::write(root.join("Work/plan.md"), "# Plan\n").unwrap();
        fs::write(root.join("Work/archive/2024.md"), "old").unwrap();
        fs::write(root.join("inbox.md"), "- buy milk\n").unwrap();
        fs::write(root.join("Ideas.md"), "").unwrap();
        fs::write(root.join("image.png"), [0u8; 4]).unwrap();
        fs::write(root.join(".hidden.md"), "").unwrap();
    }

    #[test]
    fn discover_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());
        assert_eq!(discover_workspace(tmp.path()).unwrap(), tmp.path());
        assert_eq!(
            discover_workspace(&tmp.path().join("Work/archive")).unwrap(),
            tmp.path()
        );
    }

    #[test]
    fn discover_not_found() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_workspace(tmp.path()),
            Err(WorkspaceError::NotAWorkspace)
        ));
    }

    #[test]
    fn init_twice_fails() {
        let tmp = TempDir::new().unwrap();
        init_workspace(tmp.path(), &WorkspaceConfig::named("a")).unwrap();
        assert!(tmp.path().join(".notetree/trash").is_dir());
        assert!(matches!(
            init_workspace(tmp.path(), &WorkspaceConfig::named("a")),
            Err(WorkspaceError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn load_scans_notes_and_folders() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());
        let ws = load_workspace(tmp.path()).unwrap();
        assert_eq!(ws.config.workspace.name, "test");
        assert_eq!(
            collect_keys(&ws.tree),
            vec![
                "Work",
                "Work/archive",
                "Work/archive/2024.md",
                "Work/plan.md",
                "Ideas.md",
                "inbox.md"
            ]
        );
        assert_eq!(ws.tree[1].title, "Ideas");
        assert!(ws.tree[1].is_leaf());
        assert!(!ws.tree[0].is_leaf());
    }

    #[cfg(unix)]
    #[test]
    fn load_skips_symlinks() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("inbox.md"), tmp.path().join("alias.md")).unwrap();

        let ws = load_workspace(tmp.path()).unwrap();
        let keys = collect_keys(&ws.tree);
        assert_eq!(keys.len(), 6);
        assert!(!keys.iter().any(|k| k.starts_with("loop") || k == "alias.md"));
    }

    #[test]
    fn load_applies_recorded_order() {
        let tmp = TempDir::new().unwrap();
        create_test_workspace(tmp.path());
        let mut state = ViewState::default();
        state
            .order
            .insert("".into(), vec!["inbox.md".into(), "Work".into()]);
        write_view_state(&tmp.path().join(META_DIR), &state).unwrap();

        let ws = load_workspace(tmp.path()).unwrap();
        let top: Vec<&str> = ws.tree.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(top, vec!["inbox.md", "Work", "Ideas.md"]);
    }

    #[test]
    fn load_without_meta_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            load_workspace(tmp.path()),
            Err(WorkspaceError::NotAWorkspace)
        ));
    }

    #[test]
    fn note_titles() {
        assert_eq!(note_title("plan.md", "md").as_deref(), Some("plan"));
        assert_eq!(note_title("plan.txt", "md"), None);
        assert_eq!(note_title(".md", "md"), None);
        assert_eq!(note_title("xmd", "md"), None);
        assert_eq!(note_title("anything", "").as_deref(), Some("anything"));
    }
}
