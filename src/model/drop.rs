use serde::{Deserialize, Serialize};

/// Where a dragged node lands relative to the drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Among the target's siblings, immediately before it
    Before,
    /// As the first child of the target
    Inside,
    /// Among the target's siblings, immediately after it
    After,
}

impl DropPosition {
    /// Map a signed drop offset: 0 → inside, negative → before, positive → after.
    pub fn from_offset(offset: i64) -> Self {
        match offset.signum() {
            0 => DropPosition::Inside,
            -1 => DropPosition::Before,
            _ => DropPosition::After,
        }
    }

    /// The canonical signed offset for this position
    pub fn offset(self) -> i64 {
        match self {
            DropPosition::Before => -1,
            DropPosition::Inside => 0,
            DropPosition::After => 1,
        }
    }
}

impl std::fmt::Display for DropPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropPosition::Before => write!(f, "before"),
            DropPosition::Inside => write!(f, "inside"),
            DropPosition::After => write!(f, "after"),
        }
    }
}

/// A drag/drop descriptor: move `drag_key` relative to `drop_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub drag_key: String,
    pub drop_key: String,
    pub position: DropPosition,
}

impl MoveRequest {
    pub fn new(drag_key: impl Into<String>, drop_key: impl Into<String>, offset: i64) -> Self {
        MoveRequest {
            drag_key: drag_key.into(),
            drop_key: drop_key.into(),
            position: DropPosition::from_offset(offset),
        }
    }
}
