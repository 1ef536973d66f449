//! Settings file loader.
//!
//! # Design
//! - IO and parsing only; shape rules live in `model::Settings::validate`.
//! - The path is explicit; `default_config_path` resolves the conventional
//!   location for callers that do not pass one.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

/// Environment variable overriding the settings file location.
pub const CONFIG_PATH_ENV: &str = "SLUICE_CONFIG";

/// Load and validate settings from a TOML file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, is not valid TOML, or
/// fails `Settings::validate`.
pub fn load(path: &Path) -> ConfigResult<Settings> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Resolve the settings path: `$SLUICE_CONFIG`, else `~/.config/sluice/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("sluice").join("config.toml")
}
