use std::fs;
use std::path::Path;

use crate::io::workspace_io::WorkspaceError;
use crate::model::config::WorkspaceConfig;

/// Read the workspace config, returning both the parsed config and the raw
/// toml_edit document for round-trip-safe editing.
pub fn read_config(meta_dir: &Path) -> Result<(WorkspaceConfig, toml_edit::DocumentMut), WorkspaceError> {
    let config_path = meta_dir.join("config.toml");
    let config_text = fs::read_to_string(&config_path).map_err(|e| WorkspaceError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;
    let config: WorkspaceConfig = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(meta_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), WorkspaceError> {
    let config_path = meta_dir.join("config.toml");
    crate::io::recovery::atomic_write(&config_path, doc.to_string().as_bytes()).map_err(|e| {
        WorkspaceError::ReadError {
            path: config_path,
            source: e,
        }
    })?;
    Ok(())
}

/// Set a dotted key such as `timeline.preview_lines` in the document.
///
/// The value is typed after the field it sets, so `workspace.name = 2025`
/// stays a string. The edited document must still parse as a valid config.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<WorkspaceConfig, WorkspaceError> {
    let Some((section, field)) = key.split_once('.') else {
        return Err(WorkspaceError::UnknownConfigKey(key.to_string()));
    };
    if section.is_empty() || field.is_empty() || field.contains('.') {
        return Err(WorkspaceError::UnknownConfigKey(key.to_string()));
    }

    let schema = toml::Value::try_from(WorkspaceConfig::named(""))?;
    let Some(slot) = schema.get(section).and_then(|t| t.get(field)) else {
        return Err(WorkspaceError::UnknownConfigKey(key.to_string()));
    };
    let invalid = |reason: &str| WorkspaceError::InvalidConfigValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    let value = match slot {
        toml::Value::Integer(_) => {
            let n = raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 0)
                .ok_or_else(|| invalid("expected a non-negative integer"))?;
            toml_edit::value(n)
        }
        toml::Value::Boolean(_) => {
            toml_edit::value(raw.parse::<bool>().map_err(|_| invalid("expected true or false"))?)
        }
        _ => toml_edit::value(raw),
    };

    let mut edited = doc.clone();
    if !edited.contains_key(section) {
        edited[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    edited[section][field] = value;

    let config: WorkspaceConfig = toml::from_str(&edited.to_string())?;
    if config.host.timeout_ms == 0 {
        return Err(invalid("must be greater than 0"));
    }
    *doc = edited;
    Ok(config)
}
