use serde::{Deserialize, Serialize};

/// Configuration from .notetree/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub notes: NotesConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Extension (without the dot) of files shown as notes
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            extension: default_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Number of non-empty lines shown per note
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
    /// Maximum display width of each preview line
    #[serde(default = "default_preview_width")]
    pub preview_width: usize,
    /// Entries shown when no --limit is given (0 = unlimited)
    #[serde(default)]
    pub limit: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            preview_lines: default_preview_lines(),
            preview_width: default_preview_width(),
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// How long a single file host request may take
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl WorkspaceConfig {
    /// Config with defaults for everything but the name
    pub fn named(name: &str) -> Self {
        WorkspaceConfig {
            workspace: WorkspaceInfo {
                name: name.to_string(),
            },
            notes: NotesConfig::default(),
            timeline: TimelineConfig::default(),
            host: HostConfig::default(),
        }
    }
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_preview_lines() -> usize {
    3
}

fn default_preview_width() -> usize {
    72
}

fn default_timeout_ms() -> u64 {
    5000
}
