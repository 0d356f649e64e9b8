use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub labeling: LabelingConfig,
    #[serde(default)]
    pub classes: ClassesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatasetConfig {
    /// Image library root; a leading `~` expands to the home directory.
    pub root: Option<String>,
    #[serde(default = "default_false")]
    pub sort_by_species: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelingConfig {
    /// Written into the `<database>` field of every saved annotation.
    #[serde(default = "default_database")]
    pub database: String,
    /// Label assigned to a box the moment it is completed.
    #[serde(default = "default_label")]
    pub default_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassesConfig {
    pub config_file: Option<String>,
}

// Default value functions
fn default_false() -> bool {
    false
}

fn default_database() -> String {
    "Unknown".to_string()
}

fn default_label() -> String {
    "1".to_string()
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            default_label: default_label(),
        }
    }
}

/// Get the path to the config file
pub fn config_path() -> PathBuf {
    let config_dir = directories::ProjectDirs::from("", "", "snappy-annotator")
        .expect("Failed to determine config directory")
        .config_dir()
        .to_path_buf();
    config_dir.join("config.toml")
}

/// Load configuration from file, or return default if file doesn't exist
pub fn load_config() -> AppConfig {
    let path = config_path();
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path)
        .map_err(AppError::from)
        .and_then(|content| parse_config(&content))
    {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config file: {e}. Using defaults.");
            AppConfig::default()
        }
    }
}

fn parse_config(content: &str) -> Result<AppConfig> {
    Ok(toml::from_str(content)?)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml)?;
    Ok(())
}

/// Expand a leading `~` and turn the result into a path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Library root resolution order: command line first, then the config file.
pub fn resolve_library_root(cli_root: Option<&str>, config: &AppConfig) -> Option<PathBuf> {
    cli_root
        .map(expand_path)
        .or_else(|| config.dataset.root.as_deref().map(expand_path))
}
