use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::io::workspace_io::note_title;

/// What happened to an entry on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// Change to one or more workspace entries, by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEvent {
    pub kind: ChangeKind,
    pub keys: Vec<String>,
}

/// Watches a workspace root for note and folder changes.
pub struct WorkspaceWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<WorkspaceEvent>,
}

impl WorkspaceWatcher {
    pub fn start(root: &Path, extension: &str) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let root_owned = root.to_path_buf();
        let extension = extension.to_string();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!("watch error: {}", e);
                        return;
                    }
                };
                let kind = match event.kind {
                    EventKind::Create(_) => ChangeKind::Created,
                    EventKind::Modify(_) => ChangeKind::Modified,
                    EventKind::Remove(_) => ChangeKind::Removed,
                    _ => return,
                };

                let keys: Vec<String> = event
                    .paths
                    .iter()
                    .filter_map(|p| relevant_key(p, &root_owned, &extension))
                    .collect();
                if !keys.is_empty() {
                    let _ = tx.send(WorkspaceEvent { kind, keys });
                }
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching workspace");
        Ok(WorkspaceWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Block up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<WorkspaceEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

/// Workspace key for `path` if a change there matters to the tree.
///
/// Paths outside `root` or under any hidden component (which covers
/// `.notetree/`) are ignored. Files must carry the note extension.
/// A path with no extension at all counts as a folder, since a removed
/// path can no longer be stat'ed.
pub fn relevant_key(path: &Path, root: &Path, extension: &str) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for comp in rel.components() {
        let s = comp.as_os_str().to_str()?;
        if s.starts_with('.') {
            return None;
        }
        parts.push(s);
    }
    let name = *parts.last()?;
    let is_dir = path.is_dir() || Path::new(name).extension().is_none();
    if !is_dir && note_title(name, extension).is_none() {
        return None;
    }
    Some(parts.join("/"))
}
