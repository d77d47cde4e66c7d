use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Default number of days before entries are prunable.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Written once at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- notetree recovery log: note content that could not be saved normally,
     content overwritten by a replacing move, and where trashed entries went.
     View with: nt recovery
     Prune old entries: nt recovery prune -->

---
";

/// Separates the timestamp from the category in an entry header.
const HEADER_SEP: &str = " - ";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// A note write failed; body is the unsaved content
    Write,
    /// A move replaced an existing note; body is the old content
    Replace,
    /// An entry was moved to the trash; fields say where
    Trash,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Replace => write!(f, "replace"),
            RecoveryCategory::Trash => write!(f, "trash"),
        }
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "write" => Some(RecoveryCategory::Write),
            "replace" => Some(RecoveryCategory::Replace),
            "trash" => Some(RecoveryCategory::Trash),
            _ => None,
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

/// Path of the recovery log inside the `.notetree/` directory.
pub fn recovery_log_path(meta_dir: &Path) -> PathBuf {
    meta_dir.join(".recovery.log")
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing entries
// ---------------------------------------------------------------------------

/// A backtick fence longer than any backtick run in `body`.
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

impl RecoveryEntry {
    /// Markdown as stored in the log. The body is fenced so that it reads
    /// back byte for byte, including any fences of its own.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {}{}{}: {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            HEADER_SEP,
            self.category,
            self.description,
        );

        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }

        if !self.body.is_empty() {
            let fence = fence_for(&self.body);
            out.push_str(&format!("\n{}text\n", fence));
            out.push_str(&self.body);
            out.push('\n');
            out.push_str(&fence);
            out.push('\n');
        }

        out.push_str("\n---\n");
        out
    }

    /// Serialize to JSON value for `nt recovery --json`.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

/// Append an entry to the log. Failures are reported, never propagated.
pub fn log_recovery(meta_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = log_recovery_inner(meta_dir, &entry) {
        tracing::error!(category = %entry.category, "could not write to recovery log: {}", e);
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn log_recovery_inner(meta_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(meta_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    tracing::info!(category = %entry.category, "recovery entry logged: {}", entry.description);
    Ok(())
}

/// Record note content that is about to be overwritten.
pub fn log_replaced_note(meta_dir: &Path, key: &str, replaced_by: &str, content: &str) {
    log_recovery(
        meta_dir,
        RecoveryEntry {
            timestamp: Utc::now(),
            category: RecoveryCategory::Replace,
            description: format!("{} replaced", key),
            fields: vec![
                ("Note".to_string(), key.to_string()),
                ("Replaced by".to_string(), replaced_by.to_string()),
            ],
            body: content.to_string(),
        },
    );
}

// ---------------------------------------------------------------------------
// Reading and pruning
// ---------------------------------------------------------------------------

/// Read entries, most recent first.
pub fn read_recovery_entries(meta_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(meta_dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

/// Drop entries older than `before` (or every entry when `before` is None).
/// Returns how many were removed.
pub fn prune_recovery(meta_dir: &Path, before: Option<DateTime<Utc>>) -> io::Result<usize> {
    let path = recovery_log_path(meta_dir);
    if !path.exists() {
        return Ok(0);
    }
    let content = std::fs::read_to_string(&path)?;
    let entries = parse_entries(&content);
    let (kept, removed): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|e| before.is_some_and(|cutoff| e.timestamp >= cutoff));

    let mut out = String::from(FILE_HEADER);
    for entry in &kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(removed.len())
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    // split on '\n' only, so bodies keep any '\r' they had
    let mut lines = content.split('\n').peekable();

    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix("## ") else {
            continue;
        };
        let Some((timestamp, category, description)) = parse_entry_header(header) else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut fence: Option<&str> = None;

        while let Some(line) = lines.peek() {
            if fence.is_none() && line.starts_with("## ") {
                break;
            }
            let line = lines.next().unwrap_or_default();
            if let Some(open) = fence {
                if line == open {
                    fence = None;
                } else {
                    body_lines.push(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                let ticks = line.len() - line.trim_start_matches('`').len();
                fence = Some(&line[..ticks]);
                continue;
            }
            if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body: body_lines.join("\n"),
        });
    }
    entries
}

fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp_str, rest) = header.split_once(HEADER_SEP)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .ok()?
        .with_timezone(&Utc);
    let (category_str, description) = rest.split_once(": ")?;
    let category = RecoveryCategory::parse_category(category_str)?;
    Some((timestamp, category, description.to_string()))
}
