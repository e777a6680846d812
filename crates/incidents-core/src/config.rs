use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::persist::DEFAULT_FILE_NAME;

/// Name of the data directory created in the working directory by default.
pub const DATA_DIR_NAME: &str = ".incidents";
/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "INCIDENTS_DIR";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub list: ListConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File name of the durable copy inside the data directory.
    #[serde(default = "default_store_file")]
    pub file: String,
    /// How long to wait for another process to release the store lock.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: default_store_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListConfig {
    /// Show ARCHIVED incidents in `list` without `--all`.
    #[serde(default)]
    pub include_archived: bool,
}

/// Load `<data_dir>/config.toml`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed, or names a store
/// file outside the data directory.
pub fn load_config(data_dir: &Path) -> Result<ProjectConfig> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let file = config.store.file.as_str();
    if file.is_empty() || file.contains(['/', '\\']) || file == "." || file == ".." {
        anyhow::bail!(
            "Invalid store.file '{}' in {}: expected a plain file name",
            file,
            path.display()
        );
    }

    Ok(config)
}

/// Write the default config unless one already exists. Returns whether a file
/// was written.
///
/// # Errors
///
/// Fails when the directory or file cannot be written.
pub fn write_default_config(data_dir: &Path) -> Result<bool> {
    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let body = toml::to_string_pretty(&ProjectConfig::default())
        .context("Failed to render default config")?;
    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Pick the data directory: explicit flag, then `INCIDENTS_DIR`, then
/// `.incidents` under `cwd`.
#[must_use]
pub fn resolve_data_dir(cli_dir: Option<&Path>, env_dir: Option<String>, cwd: &Path) -> PathBuf {
    if let Some(dir) = cli_dir {
        return cwd.join(dir);
    }
    if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        return cwd.join(dir);
    }
    cwd.join(DATA_DIR_NAME)
}

fn default_store_file() -> String {
    DEFAULT_FILE_NAME.to_string()
}

const fn default_lock_timeout_ms() -> u64 {
    2_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.store.file, "incidents.json");
        assert_eq!(cfg.store.lock_timeout(), Duration::from_secs(2));
        assert!(!cfg.list.include_archived);
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[list]\ninclude_archived = true\n",
        )
        .unwrap();

        let cfg = load_config(dir.path()).unwrap();
        assert!(cfg.list.include_archived);
        assert_eq!(cfg.store, StoreConfig::default());
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[store\nfile = 3").unwrap();

        let err = load_config(dir.path()).unwrap_err();
        assert!(format!("{err}").contains("config.toml"));
    }

    #[test]
    fn store_file_must_stay_inside_data_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[store]\nfile = \"../elsewhere.json\"\n",
        )
        .unwrap();

        assert!(load_config(dir.path()).is_err());
    }

    #[test]
    fn default_config_round_trips_and_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        assert!(write_default_config(dir.path()).unwrap());
        assert!(!write_default_config(dir.path()).unwrap());
        assert_eq!(load_config(dir.path()).unwrap(), ProjectConfig::default());
    }

    #[test]
    fn data_dir_precedence() {
        let cwd = Path::new("/work");
        assert_eq!(
            resolve_data_dir(Some(Path::new("flag")), Some("env".to_string()), cwd),
            PathBuf::from("/work/flag")
        );
        assert_eq!(
            resolve_data_dir(None, Some("/abs/env".to_string()), cwd),
            PathBuf::from("/abs/env")
        );
        assert_eq!(
            resolve_data_dir(None, Some("  ".to_string()), cwd),
            PathBuf::from("/work/.incidents")
        );
    }
}
