use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::node::{TreeNode, base_name, join_key, parent_key};
use crate::model::timeline::TimelineEntry;
use crate::model::workspace::key_to_path;
use crate::ops::timeline::preview_text;
use crate::ops::tree_ops::{children_of, container_key};

/// Error type for filesystem operations on workspace entries
#[derive(Debug, thiserror::Error)]
pub enum FileOpError {
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
    #[error("no such entry: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("not a folder: {0}")]
    NotAFolder(String),
    #[error("not a note: {0}")]
    NotANote(String),
    #[error("{key} already exists in the destination folder{}", replace_hint(.replaceable))]
    DestinationExists { key: String, replaceable: bool },
    #[error("{key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },
}

fn replace_hint(replaceable: &bool) -> &'static str {
    if *replaceable { " (use --replace to overwrite)" } else { "" }
}

fn io_err(key: &str) -> impl FnOnce(std::io::Error) -> FileOpError + '_ {
    move |source| FileOpError::Io {
        key: key.to_string(),
        source,
    }
}

/// Reject keys that could escape the workspace or name hidden entries.
pub fn check_key(key: &str) -> Result<(), FileOpError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key
            .split('/')
            .any(|seg| seg.is_empty() || seg.starts_with('.') || seg.contains('\\'));
    if bad {
        Err(FileOpError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

fn existing(root: &Path, key: &str) -> Result<PathBuf, FileOpError> {
    check_key(key)?;
    let path = key_to_path(root, key);
    if path.exists() {
        Ok(path)
    } else {
        Err(FileOpError::NotFound(key.to_string()))
    }
}

fn fresh(root: &Path, key: &str) -> Result<PathBuf, FileOpError> {
    check_key(key)?;
    let path = key_to_path(root, key);
    if path.exists() {
        return Err(FileOpError::AlreadyExists(key.to_string()));
    }
    let parent = parent_key(key);
    if !parent.is_empty() && !key_to_path(root, parent).is_dir() {
        return Err(FileOpError::NotAFolder(parent.to_string()));
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// Notes and folders
// ---------------------------------------------------------------------------

pub fn read_note(root: &Path, key: &str) -> Result<String, FileOpError> {
    let path = existing(root, key)?;
    if path.is_dir() {
        return Err(FileOpError::NotANote(key.to_string()));
    }
    fs::read_to_string(&path).map_err(io_err(key))
}

/// Atomically replace a note's content. On failure the content is saved
/// to the recovery log before the error is returned.
pub fn write_note(root: &Path, meta_dir: &Path, key: &str, content: &str) -> Result<(), FileOpError> {
    check_key(key)?;
    let path = key_to_path(root, key);
    if path.is_dir() {
        return Err(FileOpError::NotANote(key.to_string()));
    }
    if let Err(e) = recovery::atomic_write(&path, content.as_bytes()) {
        recovery::log_recovery(
            meta_dir,
            RecoveryEntry {
                timestamp: Utc::now(),
                category: RecoveryCategory::Write,
                description: "note write failed".to_string(),
                fields: vec![
                    ("Note".to_string(), key.to_string()),
                    ("Error".to_string(), e.to_string()),
                ],
                body: content.to_string(),
            },
        );
        return Err(io_err(key)(e));
    }
    tracing::debug!(key, bytes = content.len(), "note written");
    Ok(())
}

/// Create an empty note. The containing folder must exist.
pub fn make_note(root: &Path, key: &str) -> Result<(), FileOpError> {
    let path = fresh(root, key)?;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(io_err(key))?;
    tracing::info!(key, "note created");
    Ok(())
}

/// Create a folder. The containing folder must exist.
pub fn make_dir(root: &Path, key: &str) -> Result<(), FileOpError> {
    let path = fresh(root, key)?;
    fs::create_dir(&path).map_err(io_err(key))?;
    tracing::info!(key, "folder created");
    Ok(())
}

/// Move an entry into `.notetree/trash/`, returning where it went.
///
/// The location is recorded in the recovery log so it can be restored by hand.
pub fn trash(root: &Path, meta_dir: &Path, key: &str) -> Result<PathBuf, FileOpError> {
    let path = existing(root, key)?;
    let trash_dir = meta_dir.join("trash");
    fs::create_dir_all(&trash_dir).map_err(io_err(key))?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let name = base_name(key);
    let mut dest = trash_dir.join(format!("{}-{}", stamp, name));
    let mut n = 1;
    while dest.exists() {
        dest = trash_dir.join(format!("{}-{}-{}", stamp, n, name));
        n += 1;
    }

    fs::rename(&path, &dest).map_err(io_err(key))?;
    recovery::log_recovery(
        meta_dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Trash,
            description: format!("{} moved to trash", key),
            fields: vec![
                ("Entry".to_string(), key.to_string()),
                ("Location".to_string(), dest.display().to_string()),
            ],
            body: String::new(),
        },
    );
    tracing::info!(key, dest = %dest.display(), "entry trashed");
    Ok(dest)
}

/// Rename or move an entry. Fails if the destination exists.
pub fn rename(root: &Path, from: &str, to: &str) -> Result<(), FileOpError> {
    let src = existing(root, from)?;
    let dst = fresh(root, to)?;
    fs::rename(&src, &dst).map_err(io_err(from))?;
    tracing::info!(from, to, "entry renamed");
    Ok(())
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Timeline entries for the direct children of `folder` (`""` = root),
/// unsorted. Notes carry a preview of their first lines.
pub fn timeline_entries(
    root: &Path,
    tree: &[TreeNode],
    folder: &str,
    preview_lines: usize,
    preview_width: usize,
) -> Result<Vec<TimelineEntry>, FileOpError> {
    let children = children_of(tree, folder).ok_or_else(|| FileOpError::NotAFolder(folder.to_string()))?;
    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        let path = key_to_path(root, &child.key);
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(io_err(&child.key))?;
        let preview = if child.is_leaf() {
            let content = fs::read_to_string(&path).map_err(io_err(&child.key))?;
            preview_text(&content, preview_lines, preview_width)
        } else {
            String::new()
        };
        entries.push(TimelineEntry {
            key: child.key.clone(),
            title: child.title.clone(),
            is_file: child.is_leaf(),
            modified: DateTime::<Local>::from(modified),
            preview,
            child_count: child.children.as_ref().map(Vec::len),
        });
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Drop planning
// ---------------------------------------------------------------------------

/// Disk move implied by a reconciled tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropPlan {
    pub from: String,
    pub to: String,
}

/// What the destination of a drop looks like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropCheck {
    /// Same folder: only the display order changes
    Unchanged,
    /// Destination is free
    Clear,
    /// A note with the same name exists; replacing it is allowed
    FileExists,
    /// A folder is involved on either side; refused
    FolderExists,
}

/// Work out where `drag_key` lives on disk after a move, given the tree the
/// reconciler produced. None if `drag_key` is not in the tree.
pub fn plan_drop(tree_after: &[TreeNode], drag_key: &str) -> Option<DropPlan> {
    let container = container_key(tree_after, drag_key)?;
    Some(DropPlan {
        from: drag_key.to_string(),
        to: join_key(&container, base_name(drag_key)),
    })
}

pub fn check_drop(root: &Path, plan: &DropPlan) -> Result<DropCheck, FileOpError> {
    let src = existing(root, &plan.from)?;
    if plan.from == plan.to {
        return Ok(DropCheck::Unchanged);
    }
    check_key(&plan.to)?;
    let dst = key_to_path(root, &plan.to);
    if !dst.exists() {
        return Ok(DropCheck::Clear);
    }
    if dst.is_dir() || src.is_dir() {
        Ok(DropCheck::FolderExists)
    } else {
        Ok(DropCheck::FileExists)
    }
}

/// Carry out a drop on disk. A same-name note is only overwritten when
/// `replace` is set, and its old content goes to the recovery log first.
pub fn execute_drop(
    root: &Path,
    meta_dir: &Path,
    plan: &DropPlan,
    replace: bool,
) -> Result<DropCheck, FileOpError> {
    let check = check_drop(root, plan)?;
    match check {
        DropCheck::Unchanged => {}
        DropCheck::Clear => rename(root, &plan.from, &plan.to)?,
        DropCheck::FileExists if replace => {
            let old = read_note(root, &plan.to)?;
            recovery::log_replaced_note(meta_dir, &plan.to, &plan.from, &old);
            fs::rename(key_to_path(root, &plan.from), key_to_path(root, &plan.to))
                .map_err(io_err(&plan.from))?;
            tracing::info!(from = %plan.from, to = %plan.to, "note replaced by drop");
        }
        DropCheck::FileExists | DropCheck::FolderExists => {
            return Err(FileOpError::DestinationExists {
                key: plan.to.clone(),
                replaceable: check == DropCheck::FileExists,
            });
        }
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::read_recovery_entries;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let meta = tmp.path().join(".notetree");
        fs::create_dir_all(&meta).unwrap();
        fs::create_dir_all(tmp.path().join("work")).unwrap();
        fs::write(tmp.path().join("work/plan.md"), "plan").unwrap();
        fs::write(tmp.path().join("plan.md"), "root plan").unwrap();
        fs::write(tmp.path().join("inbox.md"), "inbox").unwrap();
        (tmp, meta)
    }

    #[test]
    fn key_checks() {
        assert!(check_key("a/b.md").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/etc/passwd").is_err());
        assert!(check_key("a/../b").is_err());
        assert!(check_key("a//b").is_err());
        assert!(check_key(".notetree/config.toml").is_err());
    }

    #[test]
    fn read_write_make() {
        let (tmp, meta) = setup();
        let root = tmp.path();
        assert_eq!(read_note(root, "work/plan.md").unwrap(), "plan");
        assert!(matches!(read_note(root, "work"), Err(FileOpError::NotANote(_))));
        assert!(matches!(read_note(root, "nope.md"), Err(FileOpError::NotFound(_))));

        write_note(root, &meta, "work/plan.md", "updated").unwrap();
        assert_eq!(read_note(root, "work/plan.md").unwrap(), "updated");

        make_note(root, "work/new.md").unwrap();
        assert_eq!(read_note(root, "work/new.md").unwrap(), "");
        assert!(matches!(make_note(root, "work/new.md"), Err(FileOpError::AlreadyExists(_))));
        assert!(matches!(make_note(root, "ghost/new.md"), Err(FileOpError::NotAFolder(_))));

        make_dir(root, "work/sub").unwrap();
        assert!(root.join("work/sub").is_dir());
    }

    #[test]
    fn failed_write_goes_to_recovery_log() {
        let (tmp, meta) = setup();
        let err = write_note(tmp.path(), &meta, "missing-dir/x.md", "precious").unwrap_err();
        assert!(matches!(err, FileOpError::Io { .. }));
        let entries = read_recovery_entries(&meta, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Write);
        assert_eq!(entries[0].body, "precious");
    }

    #[test]
    fn trash_moves_entry_and_records_location() {
        let (tmp, meta) = setup();
        let dest = trash(tmp.path(), &meta, "work").unwrap();
        assert!(!tmp.path().join("work").exists());
        assert!(dest.join("plan.md").exists());
        assert!(dest.starts_with(meta.join("trash")));

        let entries = read_recovery_entries(&meta, None);
        assert_eq!(entries[0].category, RecoveryCategory::Trash);

        // a second entry with the same name trashed within the same second
        fs::create_dir_all(tmp.path().join("work")).unwrap();
        let second = trash(tmp.path(), &meta, "work").unwrap();
        assert_ne!(dest, second);
    }

    #[test]
    fn rename_refuses_existing_destination() {
        let (tmp, _) = setup();
        rename(tmp.path(), "inbox.md", "work/inbox.md").unwrap();
        assert!(tmp.path().join("work/inbox.md").exists());
        assert!(matches!(
            rename(tmp.path(), "plan.md", "work/plan.md"),
            Err(FileOpError::AlreadyExists(_))
        ));
    }

    #[test]
    fn timeline_entries_for_folder() {
        let (tmp, _) = setup();
        fs::write(tmp.path().join("work/plan.md"), "# Plan\n\nship it\n").unwrap();
        let tree = crate::io::workspace_io::scan_tree(tmp.path(), "md").unwrap();

        let root_entries = timeline_entries(tmp.path(), &tree, "", 3, 40).unwrap();
        assert_eq!(root_entries.len(), 3);
        let work = root_entries.iter().find(|e| e.key == "work").unwrap();
        assert!(!work.is_file);
        assert_eq!(work.child_count, Some(1));
        assert_eq!(work.preview, "");

        let entries = timeline_entries(tmp.path(), &tree, "work", 3, 40).unwrap();
        assert_eq!(entries[0].preview, "Plan\nship it");
        assert!(matches!(
            timeline_entries(tmp.path(), &tree, "plan.md", 3, 40),
            Err(FileOpError::NotAFolder(_))
        ));
    }

    #[test]
    fn plan_drop_follows_new_container() {
        let tree = vec![TreeNode::folder(
            "work",
            "work",
            vec![TreeNode::leaf("inbox.md", "inbox"), TreeNode::leaf("work/plan.md", "plan")],
        )];
        let plan = plan_drop(&tree, "inbox.md").unwrap();
        assert_eq!(
            plan,
            DropPlan {
                from: "inbox.md".into(),
                to: "work/inbox.md".into()
            }
        );
        assert!(plan_drop(&tree, "ghost").is_none());
    }

    #[test]
    fn drop_checks() {
        let (tmp, meta) = setup();
        let root = tmp.path();
        let same = DropPlan { from: "inbox.md".into(), to: "inbox.md".into() };
        assert_eq!(check_drop(root, &same).unwrap(), DropCheck::Unchanged);
        let clear = DropPlan { from: "inbox.md".into(), to: "work/inbox.md".into() };
        assert_eq!(check_drop(root, &clear).unwrap(), DropCheck::Clear);
        let file = DropPlan { from: "plan.md".into(), to: "work/plan.md".into() };
        assert_eq!(check_drop(root, &file).unwrap(), DropCheck::FileExists);

        fs::create_dir_all(root.join("archive/work")).unwrap();
        let folder = DropPlan { from: "work".into(), to: "archive/work".into() };
        assert_eq!(check_drop(root, &folder).unwrap(), DropCheck::FolderExists);
        assert!(matches!(
            execute_drop(root, &meta, &folder, true),
            Err(FileOpError::DestinationExists { replaceable: false, .. })
        ));
    }

    #[test]
    fn replacing_drop_needs_flag_and_logs_old_content() {
        let (tmp, meta) = setup();
        let root = tmp.path();
        let plan = DropPlan { from: "plan.md".into(), to: "work/plan.md".into() };

        assert!(matches!(
            execute_drop(root, &meta, &plan, false),
            Err(FileOpError::DestinationExists { replaceable: true, .. })
        ));
        assert_eq!(read_note(root, "work/plan.md").unwrap(), "plan");

        assert_eq!(execute_drop(root, &meta, &plan, true).unwrap(), DropCheck::FileExists);
        assert_eq!(read_note(root, "work/plan.md").unwrap(), "root plan");
        assert!(!root.join("plan.md").exists());

        let entries = read_recovery_entries(&meta, None);
        assert_eq!(entries[0].category, RecoveryCategory::Replace);
        assert_eq!(entries[0].body, "plan");
    }
}
