use serde::Serialize;

use crate::io::file_ops::{DropCheck, DropPlan};
use crate::io::state::ViewState;
use crate::model::drop::DropPosition;
use crate::model::node::TreeNode;
use crate::model::timeline::TimelineEntry;
use crate::util::unicode::{capitalize_first, display_width, pad_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct NodeJson {
    pub key: String,
    pub title: String,
    pub is_leaf: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeJson>>,
}

#[derive(Serialize)]
pub struct TreeJson {
    pub workspace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub nodes: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct MoveJson {
    pub drag: String,
    pub drop: String,
    pub position: DropPosition,
    /// False when the move was rejected and the tree left as it was
    pub moved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<DropPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<DropCheck>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct TimelineJson {
    pub folder: String,
    pub entries: Vec<TimelineEntry>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn node_to_json(node: &TreeNode) -> NodeJson {
    NodeJson {
        key: node.key.clone(),
        title: node.title.clone(),
        is_leaf: node.is_leaf(),
        children: node
            .children
            .as_ref()
            .map(|c| c.iter().map(node_to_json).collect()),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Indented tree listing. Folders end in `/`; the selected entry is marked `*`.
pub fn format_tree(tree: &[TreeNode], state: Option<&ViewState>) -> Vec<String> {
    let selected = state.and_then(|s| s.selected.as_deref());
    let mut lines = Vec::new();
    push_tree_lines(tree, 0, selected, &mut lines);
    lines
}

fn push_tree_lines(nodes: &[TreeNode], depth: usize, selected: Option<&str>, lines: &mut Vec<String>) {
    for node in nodes {
        let suffix = if node.is_leaf() { "" } else { "/" };
        let marker = if selected == Some(node.key.as_str()) { "  *" } else { "" };
        lines.push(format!("{}{}{}{}", "  ".repeat(depth), node.title, suffix, marker));
        push_tree_lines(node.child_nodes(), depth + 1, selected, lines);
    }
}

/// Folder timeline: a capitalized header, then one row per entry with its
/// modification time, followed by the note preview indented below it.
pub fn format_timeline(header: &str, entries: &[TimelineEntry]) -> Vec<String> {
    let mut lines = vec![capitalize_first(header), String::new()];
    if entries.is_empty() {
        lines.push("  (empty)".to_string());
        return lines;
    }

    let name = |e: &TimelineEntry| {
        if e.is_file {
            e.title.clone()
        } else {
            format!("{}/", e.title)
        }
    };
    let width = entries
        .iter()
        .map(|e| display_width(&name(e)))
        .max()
        .unwrap_or(0)
        .min(32);

    for entry in entries {
        let detail = match entry.child_count {
            Some(1) => "  (1 item)".to_string(),
            Some(n) => format!("  ({} items)", n),
            None => String::new(),
        };
        lines.push(format!(
            "  {}  {}{}",
            pad_to_width(&name(entry), width),
            entry.modified.format("%Y-%m-%d %H:%M"),
            detail
        ));
        for preview in entry.preview.lines() {
            lines.push(format!("      {}", preview));
        }
    }
    lines
}

/// One-line summary of what `mv` did or would do.
pub fn format_move(result: &MoveJson) -> String {
    if let Some(err) = &result.error {
        return format!("not moved: {}", err);
    }
    let verb = if result.dry_run { "would move" } else { "moved" };
    let mut line = format!("{} {} {} {}", verb, result.drag, result.position, result.drop);
    if let Some(plan) = &result.plan
        && plan.from != plan.to
    {
        line.push_str(&format!(" ({} -> {})", plan.from, plan.to));
    }
    if result.check == Some(DropCheck::FileExists) {
        line.push_str(if result.dry_run {
            " [would replace existing note]"
        } else {
            " [replaced existing note]"
        });
    }
    line
}
