use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::migrate;
use crate::resolver::NoteFile;
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("frontmatter in {path} is not valid YAML: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings as loaded, plus the migration steps that ran on the way.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub applied_steps: Vec<f64>,
    /// False when no settings file existed and defaults were used.
    pub from_disk: bool,
}

impl LoadedSettings {
    pub fn was_migrated(&self) -> bool {
        !self.applied_steps.is_empty()
    }
}

/// Parse a raw settings blob, migrating it to the current schema first.
pub fn settings_from_blob(mut blob: Value, path: &Path) -> Result<(Settings, Vec<f64>), StoreError> {
    let applied_steps = migrate::migrate(&mut blob);
    let settings = serde_json::from_value(blob).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((settings, applied_steps))
}

/// Load settings from disk. A missing file yields the defaults.
pub async fn load_settings(path: &Path) -> Result<LoadedSettings, StoreError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(LoadedSettings {
            settings: Settings::default(),
            applied_steps: Vec::new(),
            from_disk: false,
        });
    }

    let content = fs::read_to_string(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let blob: Value = serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let (settings, applied_steps) = settings_from_blob(blob, path)?;
    if !applied_steps.is_empty() {
        info!(
            path = %path.display(),
            steps = applied_steps.len(),
            version = settings.version,
            "migrated settings"
        );
    }

    Ok(LoadedSettings {
        settings,
        applied_steps,
        from_disk: true,
    })
}

/// Write settings as pretty JSON, creating the parent folder if needed.
pub async fn save_settings(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let content = serde_json::to_string_pretty(settings).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).await.map_err(io_err)?;
    Ok(())
}

// ── Notes ──────────────────────────────────────────────────────────────────

/// Split YAML frontmatter from a markdown body. Returns `None` for the
/// frontmatter when the note doesn't open with a `---` block.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let trimmed = content.trim_start();
    let Some(after_first) = trimmed.strip_prefix("---") else {
        return (None, content);
    };
    let Some(close_pos) = after_first.find("\n---") else {
        return (None, content);
    };

    let yaml = after_first[..close_pos].trim();
    let body = after_first[close_pos + 4..].trim_start_matches(['\r', '\n']);
    (Some(yaml), body)
}

/// Parse a note's frontmatter into JSON values. Empty when there is none.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<Map<String, Value>, StoreError> {
    let Some(yaml) = split_frontmatter(content).0.filter(|y| !y.is_empty()) else {
        return Ok(Map::new());
    };
    let value: Value = serde_yaml::from_str(yaml).map_err(|source| StoreError::Frontmatter {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Vault-relative, `/`-separated path of `path`; unchanged when it lies
/// outside `vault`.
pub fn vault_relative_path(path: &Path, vault: Option<&Path>) -> String {
    let relative = vault
        .and_then(|vault| path.strip_prefix(vault).ok())
        .unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read a markdown note from disk.
pub async fn read_note(path: &Path, vault: Option<&Path>) -> Result<(NoteFile, Map<String, Value>), StoreError> {
    let content = fs::read_to_string(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let frontmatter = parse_frontmatter(&content, path)?;
    let file = NoteFile::new(&vault_relative_path(path, vault));
    Ok((file, frontmatter))
}
