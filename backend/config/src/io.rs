//! Config file location and loading.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the config directory.
/// Priority: `TAWJIHI_CONFIG_DIR` env > `~/.tawjihi/` > `./.tawjihi`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TAWJIHI_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".tawjihi"),
        None => PathBuf::from(".tawjihi"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk as a raw JSON value.
///
/// Returns an empty object if the file doesn't exist (first run). The raw
/// value is returned so `${VAR}` references can be resolved before typing.
pub async fn load_raw_config(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    // An empty YAML document parses to null.
    Ok(if value.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        value
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_raw_config(&dir.path().join("nope.yaml")).await.unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_file_loads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "").unwrap();
        let value = load_raw_config(&path).await.unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn yaml_is_read_as_json_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "server:\n  port: 8123\n").unwrap();
        let value = load_raw_config(&path).await.unwrap();
        assert_eq!(value["server"]["port"], 8123);
    }
}
