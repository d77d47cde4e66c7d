use std::collections::{BTreeMap, HashSet};

use crate::model::node::{ROOT_KEY, TreeNode, base_name};

/// Error type for structural tree edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("key already present in tree: {0}")]
    DuplicateKey(String),
    #[error("not a folder: {0}")]
    NotAFolder(String),
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Depth-first, pre-order search for `key`.
pub fn find_node<'a>(tree: &'a [TreeNode], key: &str) -> Option<&'a TreeNode> {
    find_with_siblings(tree, key).map(|(node, _)| node)
}

/// Find a node together with the sibling sequence that contains it.
pub fn find_with_siblings<'a>(
    tree: &'a [TreeNode],
    key: &str,
) -> Option<(&'a TreeNode, &'a [TreeNode])> {
    for node in tree {
        if node.key == key {
            return Some((node, tree));
        }
        if let Some(found) = find_with_siblings(node.child_nodes(), key) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'a>(tree: &'a mut [TreeNode], key: &str) -> Option<&'a mut TreeNode> {
    for node in tree.iter_mut() {
        if node.key == key {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut()
            && let Some(found) = find_node_mut(children, key)
        {
            return Some(found);
        }
    }
    None
}

/// Key of the node whose children hold `key`; `""` when it sits at the root.
pub fn container_key(tree: &[TreeNode], key: &str) -> Option<String> {
    fn walk(nodes: &[TreeNode], parent: &str, key: &str) -> Option<String> {
        for node in nodes {
            if node.key == key {
                return Some(parent.to_string());
            }
            if let Some(found) = walk(node.child_nodes(), &node.key, key) {
                return Some(found);
            }
        }
        None
    }
    walk(tree, ROOT_KEY, key)
}

/// The sibling sequence owned by a container key (`""` for the root).
pub fn children_of<'a>(tree: &'a [TreeNode], container: &str) -> Option<&'a [TreeNode]> {
    if container == ROOT_KEY {
        return Some(tree);
    }
    find_node(tree, container).and_then(|n| n.children.as_deref())
}

// ---------------------------------------------------------------------------
// Counting and validation
// ---------------------------------------------------------------------------

pub fn count_nodes(tree: &[TreeNode]) -> usize {
    tree.iter().map(|n| 1 + count_nodes(n.child_nodes())).sum()
}

/// All keys in pre-order.
pub fn collect_keys(tree: &[TreeNode]) -> Vec<String> {
    let mut keys = Vec::new();
    for_each_node(tree, &mut |n| keys.push(n.key.clone()));
    keys
}

/// Check that no key appears twice.
pub fn validate(tree: &[TreeNode]) -> Result<(), TreeError> {
    let mut seen = HashSet::new();
    let mut dup = None;
    for_each_node(tree, &mut |n| {
        if dup.is_none() && !seen.insert(n.key.clone()) {
            dup = Some(n.key.clone());
        }
    });
    match dup {
        Some(key) => Err(TreeError::DuplicateKey(key)),
        None => Ok(()),
    }
}

fn for_each_node(tree: &[TreeNode], f: &mut dyn FnMut(&TreeNode)) {
    for node in tree {
        f(node);
        for_each_node(node.child_nodes(), f);
    }
}

// ---------------------------------------------------------------------------
// Edits (each returns a new tree)
// ---------------------------------------------------------------------------

/// Give a node a new key and title. Descendant keys are re-prefixed.
pub fn rename_node(
    tree: &[TreeNode],
    key: &str,
    new_key: &str,
    new_title: &str,
) -> Result<Vec<TreeNode>, TreeError> {
    if new_key != key && find_node(tree, new_key).is_some() {
        return Err(TreeError::DuplicateKey(new_key.to_string()));
    }
    let mut next = tree.to_vec();
    let node = find_node_mut(&mut next, key).ok_or_else(|| TreeError::NotFound(key.to_string()))?;
    node.title = new_title.to_string();
    rekey_subtree(node, new_key);
    Ok(next)
}

/// Detach a node, returning the reduced tree and the removed subtree.
pub fn remove_node(tree: &[TreeNode], key: &str) -> Result<(Vec<TreeNode>, TreeNode), TreeError> {
    fn take(nodes: &mut Vec<TreeNode>, key: &str) -> Option<TreeNode> {
        if let Some(idx) = nodes.iter().position(|n| n.key == key) {
            return Some(nodes.remove(idx));
        }
        nodes
            .iter_mut()
            .filter_map(|n| n.children.as_mut())
            .find_map(|children| take(children, key))
    }

    let mut next = tree.to_vec();
    let removed = take(&mut next, key).ok_or_else(|| TreeError::NotFound(key.to_string()))?;
    Ok((next, removed))
}

/// Append `node` to the children of `parent` (`""` for the root).
pub fn insert_node(
    tree: &[TreeNode],
    parent: &str,
    node: TreeNode,
) -> Result<Vec<TreeNode>, TreeError> {
    let incoming = collect_keys(std::slice::from_ref(&node));
    if let Some(dup) = incoming.iter().find(|k| find_node(tree, k).is_some()) {
        return Err(TreeError::DuplicateKey(dup.clone()));
    }

    let mut next = tree.to_vec();
    if parent == ROOT_KEY {
        next.push(node);
        return Ok(next);
    }
    let target =
        find_node_mut(&mut next, parent).ok_or_else(|| TreeError::NotFound(parent.to_string()))?;
    match target.children.as_mut() {
        Some(children) => children.push(node),
        None => return Err(TreeError::NotAFolder(parent.to_string())),
    }
    Ok(next)
}

/// Replace the key prefix of `node` and all of its descendants.
pub fn rekey_subtree(node: &mut TreeNode, new_key: &str) {
    let old_key = std::mem::replace(&mut node.key, new_key.to_string());
    if let Some(children) = node.children.as_mut() {
        for child in children.iter_mut() {
            let suffix = child
                .key
                .strip_prefix(old_key.as_str())
                .map(|s| s.trim_start_matches('/'))
                .unwrap_or_else(|| base_name(&child.key))
                .to_string();
            let child_key = format!("{}/{}", new_key, suffix);
            rekey_subtree(child, &child_key);
        }
    }
}

/// Reorder every sibling sequence using a recorded manual order.
///
/// `order` maps a container key to entry names. Listed names come first in
/// the recorded order; unlisted entries follow in their current order.
pub fn apply_order(tree: &mut [TreeNode], order: &BTreeMap<String, Vec<String>>) {
    fn sort_level(nodes: &mut [TreeNode], names: Option<&Vec<String>>) {
        if let Some(names) = names {
            nodes.sort_by_key(|n| {
                names
                    .iter()
                    .position(|name| name == base_name(&n.key))
                    .unwrap_or(usize::MAX)
            });
        }
    }

    fn walk(nodes: &mut [TreeNode], order: &BTreeMap<String, Vec<String>>) {
        for node in nodes.iter_mut() {
            if let Some(children) = node.children.as_mut() {
                sort_level(children, order.get(&node.key));
                walk(children, order);
            }
        }
    }

    sort_level(tree, order.get(ROOT_KEY));
    walk(tree, order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<TreeNode> {
        vec![
            TreeNode::folder(
                "projects",
                "projects",
                vec![
                    TreeNode::leaf("projects/alpha.md", "alpha"),
                    TreeNode::folder(
                        "projects/old",
                        "old",
                        vec![TreeNode::leaf("projects/old/beta.md", "beta")],
                    ),
                ],
            ),
            TreeNode::leaf("inbox.md", "inbox"),
        ]
    }

    #[test]
    fn find_node_and_siblings() {
        let tree = sample();
        let (node, siblings) = find_with_siblings(&tree, "projects/old/beta.md").unwrap();
        assert_eq!(node.title, "beta");
        assert_eq!(siblings.len(), 1);

        let (_, root_siblings) = find_with_siblings(&tree, "inbox.md").unwrap();
        assert_eq!(root_siblings.len(), 2);

        assert!(find_node(&tree, "nope").is_none());
    }

    #[test]
    fn container_keys() {
        let tree = sample();
        assert_eq!(container_key(&tree, "inbox.md").as_deref(), Some(""));
        assert_eq!(
            container_key(&tree, "projects/old/beta.md").as_deref(),
            Some("projects/old")
        );
        assert_eq!(container_key(&tree, "nope"), None);
        assert_eq!(children_of(&tree, "projects").unwrap().len(), 2);
        assert!(children_of(&tree, "inbox.md").is_none());
    }

    #[test]
    fn counting_and_keys() {
        let tree = sample();
        assert_eq!(count_nodes(&tree), 5);
        assert_eq!(
            collect_keys(&tree),
            vec![
                "projects",
                "projects/alpha.md",
                "projects/old",
                "projects/old/beta.md",
                "inbox.md"
            ]
        );
        assert!(validate(&tree).is_ok());
    }

    #[test]
    fn validate_detects_duplicates() {
        let mut tree = sample();
        tree.push(TreeNode::leaf("projects/alpha.md", "dup"));
        assert_eq!(
            validate(&tree),
            Err(TreeError::DuplicateKey("projects/alpha.md".into()))
        );
    }

    #[test]
    fn rename_rekeys_descendants() {
        let tree = sample();
        let next = rename_node(&tree, "projects/old", "projects/archive", "archive").unwrap();
        let node = find_node(&next, "projects/archive").unwrap();
        assert_eq!(node.title, "archive");
        assert!(find_node(&next, "projects/archive/beta.md").is_some());
        assert!(find_node(&next, "projects/old/beta.md").is_none());
        // input untouched
        assert!(find_node(&tree, "projects/old").is_some());
    }

    #[test]
    fn rename_rejects_existing_key() {
        let tree = sample();
        let err = rename_node(&tree, "inbox.md", "projects", "projects").unwrap_err();
        assert_eq!(err, TreeError::DuplicateKey("projects".into()));
        let err = rename_node(&tree, "nope", "x", "x").unwrap_err();
        assert_eq!(err, TreeError::NotFound("nope".into()));
    }

    #[test]
    fn remove_returns_subtree() {
        let tree = sample();
        let (next, removed) = remove_node(&tree, "projects/old").unwrap();
        assert_eq!(removed.child_nodes().len(), 1);
        assert_eq!(count_nodes(&next), 3);
        assert!(remove_node(&tree, "nope").is_err());
    }

    #[test]
    fn insert_into_folder_and_root() {
        let tree = sample();
        let next = insert_node(&tree, "projects/old", TreeNode::leaf("projects/old/g.md", "g")).unwrap();
        assert_eq!(children_of(&next, "projects/old").unwrap().len(), 2);

        let next = insert_node(&next, "", TreeNode::folder("misc", "misc", vec![])).unwrap();
        assert_eq!(next.last().unwrap().key, "misc");
    }

    #[test]
    fn insert_errors() {
        let tree = sample();
        assert_eq!(
            insert_node(&tree, "inbox.md", TreeNode::leaf("inbox.md/x", "x")).unwrap_err(),
            TreeError::NotAFolder("inbox.md".into())
        );
        assert_eq!(
            insert_node(&tree, "", TreeNode::leaf("inbox.md", "inbox")).unwrap_err(),
            TreeError::DuplicateKey("inbox.md".into())
        );
        assert_eq!(
            insert_node(&tree, "ghost", TreeNode::leaf("ghost/x.md", "x")).unwrap_err(),
            TreeError::NotFound("ghost".into())
        );
    }

    #[test]
    fn rekey_moves_prefix() {
        let mut node = sample().remove(0);
        rekey_subtree(&mut node, "work/projects");
        assert_eq!(
            collect_keys(std::slice::from_ref(&node)),
            vec![
                "work/projects",
                "work/projects/alpha.md",
                "work/projects/old",
                "work/projects/old/beta.md"
            ]
        );
    }

    #[test]
    fn apply_order_puts_listed_names_first() {
        let mut tree = sample();
        let mut order = BTreeMap::new();
        order.insert("".to_string(), vec!["inbox.md".to_string()]);
        order.insert(
            "projects".to_string(),
            vec!["old".to_string(), "alpha.md".to_string()],
        );
        apply_order(&mut tree, &order);
        assert_eq!(tree[0].key, "inbox.md");
        let projects = children_of(&tree, "projects").unwrap();
        assert_eq!(projects[0].key, "projects/old");
        assert_eq!(projects[1].key, "projects/alpha.md");
    }

    #[test]
    fn apply_order_keeps_unknown_entries_in_place() {
        let mut tree = vec![
            TreeNode::leaf("a.md", "a"),
            TreeNode::leaf("b.md", "b"),
            TreeNode::leaf("c.md", "c"),
        ];
        let mut order = BTreeMap::new();
        order.insert("".to_string(), vec!["c.md".to_string()]);
        apply_order(&mut tree, &order);
        assert_eq!(collect_keys(&tree), vec!["c.md", "a.md", "b.md"]);
    }
}
