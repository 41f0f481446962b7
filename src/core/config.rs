//! Workspace configuration loaded from `config.toml` in the data root.

use crate::core::error;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Page size the list view starts with.
    pub default_page_size: usize,
    /// Recipient handed to the notification channel for stock alerts.
    pub notify_recipient: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            notify_recipient: "inventory-alerts".to_string(),
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(schemas::CONFIG_FILE_NAME)
}

/// Missing file yields defaults; a malformed file is an error rather than a
/// silent fallback.
pub fn load_config(root: &Path) -> Result<Config, error::StocktakeError> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(&path).map_err(error::StocktakeError::IoError)?;
    toml::from_str(&raw).map_err(|e| error::StocktakeError::ConfigError(e.to_string()))
}

/// Write a default config file if none exists yet. Returns whether a file
/// was written.
pub fn write_default_config(root: &Path) -> Result<bool, error::StocktakeError> {
    let path = config_path(root);
    if path.exists() {
        return Ok(false);
    }
    let body = toml::to_string_pretty(&Config::default())
        .map_err(|e| error::StocktakeError::ConfigError(e.to_string()))?;
    let content = format!("# Stocktake workspace configuration.\n{}", body);
    fs::write(&path, content).map_err(error::StocktakeError::IoError)?;
    Ok(true)
}
