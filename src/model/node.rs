use serde::{Deserialize, Serialize};

/// Key of the implicit root container.
pub const ROOT_KEY: &str = "";

/// A keyed entry in the document hierarchy.
///
/// Folders carry `Some(children)` (possibly empty); notes carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Unique across the whole tree. In a loaded workspace this is the
    /// `/`-separated path relative to the workspace root.
    pub key: String,
    /// Display string
    pub title: String,
    /// Ordered children, present only for folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    /// Create a leaf node (a note)
    pub fn leaf(key: impl Into<String>, title: impl Into<String>) -> Self {
        TreeNode {
            key: key.into(),
            title: title.into(),
            children: None,
        }
    }

    /// Create a folder node with the given children
    pub fn folder(key: impl Into<String>, title: impl Into<String>, children: Vec<TreeNode>) -> Self {
        TreeNode {
            key: key.into(),
            title: title.into(),
            children: Some(children),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Children as a slice (empty for leaves)
    pub fn child_nodes(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// True if `key` names this node or any node below it.
    pub fn contains_key(&self, key: &str) -> bool {
        self.key == key || self.child_nodes().iter().any(|c| c.contains_key(key))
    }
}

/// Key of the container holding `key` (`""` for root-level entries).
pub fn parent_key(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[..idx],
        None => ROOT_KEY,
    }
}

/// Last path segment of a key.
pub fn base_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

/// Join a container key and an entry name.
pub fn join_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Every ancestor container of `key`, nearest last (`"a/b/c.md"` → `["a", "a/b"]`).
pub fn ancestor_keys(key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = parent_key(key);
    while !current.is_empty() {
        out.push(current.to_string());
        current = parent_key(current);
    }
    out.reverse();
    out
}
