use chrono::{DateTime, Local};
use serde::Serialize;

/// One element of a folder timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Tree key of the entry
    pub key: String,
    pub title: String,
    pub is_file: bool,
    /// Last modification time on disk
    pub modified: DateTime<Local>,
    /// Leading lines of a note (empty for folders)
    pub preview: String,
    /// Number of visible entries inside a folder (None for notes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<usize>,
}
