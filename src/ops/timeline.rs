use std::cmp::Ordering;

use crate::model::timeline::TimelineEntry;
use crate::util::unicode::truncate_to_width;

/// Order entries newest first (ties broken by title) and apply an optional limit.
pub fn build_timeline(mut entries: Vec<TimelineEntry>, limit: Option<usize>) -> Vec<TimelineEntry> {
    entries.sort_by(|a, b| match b.modified.cmp(&a.modified) {
        Ordering::Equal => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        other => other,
    });
    if let Some(n) = limit.filter(|n| *n > 0) {
        entries.truncate(n);
    }
    entries
}

/// The first `max_lines` non-empty lines of a note, each cut to `max_width` cells.
///
/// Heading markers and list bullets are dropped so the preview reads as text.
pub fn preview_text(content: &str, max_lines: usize, max_width: usize) -> String {
    let mut lines: Vec<String> = content
        .lines()
        .map(strip_markup)
        .filter(|l| !l.is_empty())
        .take(max_lines + 1)
        .map(|l| truncate_to_width(l, max_width))
        .collect();

    let more = lines.len() > max_lines;
    lines.truncate(max_lines);
    if more && let Some(last) = lines.last_mut() {
        last.push_str(" \u{2026}");
    }
    lines.join("\n")
}

fn strip_markup(line: &str) -> &str {
    let trimmed = line.trim();
    let trimmed = trimmed.trim_start_matches('#');
    let trimmed = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .unwrap_or(trimmed);
    trimmed.trim()
}
