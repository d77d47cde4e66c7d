use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::node::{TreeNode, ancestor_keys, base_name, parent_key};
use crate::ops::tree_ops::children_of;

/// Persisted tree view state (written to .notetree/state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Currently selected key
    #[serde(default)]
    pub selected: Option<String>,
    /// Folder keys shown expanded
    #[serde(default)]
    pub expanded: BTreeSet<String>,
    /// Manual child order per container key (`""` = root), by entry name
    #[serde(default)]
    pub order: BTreeMap<String, Vec<String>>,
}

impl ViewState {
    /// Select `key` and expand every folder above it.
    pub fn reveal(&mut self, key: &str) {
        self.expanded.extend(ancestor_keys(key));
        self.selected = Some(key.to_string());
    }

    /// Remember the current child order of `container` from `tree`.
    pub fn record_order(&mut self, tree: &[TreeNode], container: &str) {
        if let Some(children) = children_of(tree, container) {
            let names = children.iter().map(|c| base_name(&c.key).to_string()).collect();
            self.order.insert(container.to_string(), names);
        }
    }

    /// Rewrite state after `old_key` became `new_key` (rename or move).
    pub fn rename_key(&mut self, old_key: &str, new_key: &str) {
        let remap = |k: &str| -> Option<String> {
            if k == old_key {
                Some(new_key.to_string())
            } else {
                k.strip_prefix(old_key)
                    .filter(|rest| rest.starts_with('/'))
                    .map(|rest| format!("{}{}", new_key, rest))
            }
        };

        if let Some(sel) = self.selected.as_deref().and_then(remap) {
            self.selected = Some(sel);
        }
        self.expanded = self
            .expanded
            .iter()
            .map(|k| remap(k.as_str()).unwrap_or_else(|| k.clone()))
            .collect();
        self.order = std::mem::take(&mut self.order)
            .into_iter()
            .map(|(k, v)| (remap(k.as_str()).unwrap_or(k), v))
            .collect();
    }

    /// Drop every reference to `key` and anything below it, including its
    /// slot in the parent's recorded order.
    pub fn forget(&mut self, key: &str) {
        let under = |k: &str| k == key || k.strip_prefix(key).is_some_and(|r| r.starts_with('/'));
        if self.selected.as_deref().is_some_and(under) {
            self.selected = None;
        }
        self.expanded.retain(|k| !under(k.as_str()));
        self.order.retain(|k, _| !under(k.as_str()));
        if let Some(names) = self.order.get_mut(parent_key(key)) {
            names.retain(|n| n != base_name(key));
        }
    }
}

/// Read state.json from the `.notetree/` directory
pub fn read_view_state(meta_dir: &Path) -> Option<ViewState> {
    let content = fs::read_to_string(meta_dir.join("state.json")).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::warn!("ignoring malformed state.json: {}", e);
            None
        }
    }
}

/// Write state.json to the `.notetree/` directory
pub fn write_view_state(meta_dir: &Path, state: &ViewState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    crate::io::recovery::atomic_write(&meta_dir.join("state.json"), content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut state = ViewState::default();
        state.reveal("work/2025/plan.md");
        state.order.insert("".into(), vec!["work".into(), "inbox.md".into()]);

        write_view_state(dir.path(), &state).unwrap();
        let loaded = read_view_state(dir.path()).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.selected.as_deref(), Some("work/2025/plan.md"));
        assert!(loaded.expanded.contains("work"));
        assert!(loaded.expanded.contains("work/2025"));
    }

    #[test]
    fn read_missing_or_malformed_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_view_state(dir.path()).is_none());
        fs::write(dir.path().join("state.json"), "not json {{{").unwrap();
        assert!(read_view_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: ViewState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, ViewState::default());
    }

    #[test]
    fn record_order_captures_child_names() {
        let tree = vec![
            TreeNode::folder(
                "a",
                "a",
                vec![TreeNode::leaf("a/y.md", "y"), TreeNode::leaf("a/x.md", "x")],
            ),
            TreeNode::leaf("z.md", "z"),
        ];
        let mut state = ViewState::default();
        state.record_order(&tree, "a");
        state.record_order(&tree, "");
        state.record_order(&tree, "z.md");
        assert_eq!(state.order["a"], vec!["y.md", "x.md"]);
        assert_eq!(state.order[""], vec!["a", "z.md"]);
        assert!(!state.order.contains_key("z.md"));
    }

    #[test]
    fn rename_key_rewrites_descendants_only() {
        let mut state = ViewState::default();
        state.reveal("old/sub/n.md");
        state.expanded.insert("older".into());
        state.order.insert("old/sub".into(), vec!["n.md".into()]);

        state.rename_key("old", "new");
        assert_eq!(state.selected.as_deref(), Some("new/sub/n.md"));
        assert!(state.expanded.contains("new"));
        assert!(state.expanded.contains("new/sub"));
        assert!(state.expanded.contains("older"));
        assert!(state.order.contains_key("new/sub"));
    }

    #[test]
    fn forget_removes_subtree_references() {
        let mut state = ViewState::default();
        state.reveal("gone/n.md");
        state.expanded.insert("gone-too".into());
        state.order.insert("".into(), vec!["gone".into(), "gone-too".into()]);
        state.forget("gone");
        assert!(state.selected.is_none());
        assert_eq!(state.order[""], vec!["gone-too"]);
        assert!(!state.expanded.contains("gone"));
        assert!(state.expanded.contains("gone-too"));
    }
}
