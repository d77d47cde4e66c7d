use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::workspace_io;
use crate::model::workspace::META_DIR;

const CONFIG_TOML_TEMPLATE: &str = r##"[workspace]
name = ""

[notes]
# Files with this extension show up as notes; everything else is ignored.
extension = "md"

[timeline]
# Non-empty lines of each note shown under its timeline entry.
preview_lines = 3
preview_width = 72
# Entries shown when `nt timeline` has no --limit (0 = all).
limit = 0

[host]
# Give up on a single file operation after this long.
timeout_ms = 5000
"##;

/// Infer a workspace name from a directory name: replace hyphens and
/// underscores with spaces, title-case each word.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// config.toml with the name filled in; toml_edit handles any quoting.
fn render_config_toml(name: &str) -> Result<String, toml_edit::TomlError> {
    let mut doc: toml_edit::DocumentMut = CONFIG_TOML_TEMPLATE.parse()?;
    doc["workspace"]["name"] = toml_edit::value(name);
    Ok(doc.to_string())
}

pub fn cmd_init(args: InitArgs, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if dir.join(META_DIR).is_dir() {
        return Err(format!("notetree workspace already exists in {}", dir.display()).into());
    }

    if let Some(parent) = dir.parent()
        && let Ok(parent_root) = workspace_io::discover_workspace(parent)
    {
        eprintln!("Note: enclosing workspace found at {}/", parent_root.display());
        eprintln!("Creating a separate workspace in {}/", dir.display());
    }

    let name = args.name.unwrap_or_else(|| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Notes".to_string())
    });

    let text = render_config_toml(&name)?;
    workspace_io::init_workspace_with_text(dir, &text)?;
    println!("Initialized notetree workspace: {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::WorkspaceConfig;

    #[test]
    fn test_infer_name() {
        assert_eq!(infer_name("my-cool-notes"), "My Cool Notes");
        assert_eq!(infer_name("journal"), "Journal");
        assert_eq!(infer_name("work_log--2025"), "Work Log 2025");
    }

    #[test]
    fn test_render_config_toml() {
        let text = render_config_toml("Say \"hi\"").unwrap();
        assert!(text.contains("# Files with this extension"));
        let config: WorkspaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.workspace.name, "Say \"hi\"");
        assert_eq!(config.notes.extension, "md");
        assert_eq!(config.timeline.preview_lines, 3);
        assert_eq!(config.host.timeout_ms, 5000);
    }

    #[test]
    fn test_init_refuses_existing_workspace() {
        let tmp = tempfile::TempDir::new().unwrap();
        cmd_init(InitArgs { name: Some("a".into()) }, tmp.path()).unwrap();
        assert!(tmp.path().join(".notetree/config.toml").is_file());
        assert!(cmd_init(InitArgs { name: None }, tmp.path()).is_err());
    }
}
