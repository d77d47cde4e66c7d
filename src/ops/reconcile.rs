use crate::model::drop::{DropPosition, MoveRequest};
use crate::model::node::TreeNode;

/// Error type for drag/drop moves
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("node not found: {0}")]
    NodeNotFound(String),
    #[error("cannot drop {drag} onto {drop}: target is the dragged node or inside it")]
    SelfDropViolation { drag: String, drop: String },
}

/// Compute the tree that results from dropping `drag_key` relative to `drop_key`.
///
/// The input is only read; on success a new tree is returned in which the
/// dragged subtree has moved and every other node keeps its relative order.
/// An `Inside` drop on a leaf lands directly after the leaf.
pub fn apply_move(
    tree: &[TreeNode],
    drag_key: &str,
    drop_key: &str,
    position: DropPosition,
) -> Result<Vec<TreeNode>, MoveError> {
    let mut next = tree.to_vec();

    let dragged =
        detach(&mut next, drag_key).ok_or_else(|| MoveError::NodeNotFound(drag_key.to_string()))?;

    if dragged.contains_key(drop_key) {
        return Err(MoveError::SelfDropViolation {
            drag: drag_key.to_string(),
            drop: drop_key.to_string(),
        });
    }

    if insert_relative(&mut next, dragged, drop_key, position).is_err() {
        return Err(MoveError::NodeNotFound(drop_key.to_string()));
    }
    Ok(next)
}

impl MoveRequest {
    /// Apply this descriptor to `tree`. See [`apply_move`].
    pub fn apply(&self, tree: &[TreeNode]) -> Result<Vec<TreeNode>, MoveError> {
        apply_move(tree, &self.drag_key, &self.drop_key, self.position)
    }
}

/// Like [`apply_move`], but a failed move yields the input tree unchanged.
pub fn apply_move_or_keep(tree: Vec<TreeNode>, request: &MoveRequest) -> Vec<TreeNode> {
    match request.apply(&tree) {
        Ok(next) => next,
        Err(e) => {
            tracing::debug!(drag = %request.drag_key, drop = %request.drop_key, "move ignored: {}", e);
            tree
        }
    }
}

/// Remove the first node (pre-order) with `key`, returning it with its subtree.
fn detach(nodes: &mut Vec<TreeNode>, key: &str) -> Option<TreeNode> {
    for idx in 0..nodes.len() {
        if nodes[idx].key == key {
            return Some(nodes.remove(idx));
        }
        if let Some(children) = nodes[idx].children.as_mut()
            && let Some(found) = detach(children, key)
        {
            return Some(found);
        }
    }
    None
}

/// Insert `node` next to (or inside) the node with `drop_key`.
/// Hands the node back if the target does not exist.
fn insert_relative(
    nodes: &mut Vec<TreeNode>,
    node: TreeNode,
    drop_key: &str,
    position: DropPosition,
) -> Result<(), TreeNode> {
    let mut node = node;
    for idx in 0..nodes.len() {
        if nodes[idx].key == drop_key {
            match position {
                DropPosition::Inside if !nodes[idx].is_leaf() => {
                    if let Some(children) = nodes[idx].children.as_mut() {
                        children.insert(0, node);
                    }
                }
                DropPosition::Before => nodes.insert(idx, node),
                _ => nodes.insert(idx + 1, node),
            }
            return Ok(());
        }
        if let Some(children) = nodes[idx].children.as_mut() {
            match insert_relative(children, node, drop_key, position) {
                Ok(()) => return Ok(()),
                Err(back) => node = back,
            }
        }
    }
    Err(node)
}
