//! Workspace config file source: .niwa/config.toml and .niwa/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use crate::config::NiwaConfig;
use crate::error::{NiwaError, StorageError};
use std::path::{Path, PathBuf};

pub const CONFIG_DIR: &str = ".niwa";

/// Add workspace config files to builder.
/// Precedence: .niwa/config.toml (base) then .niwa/{NIWA_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_root.join(CONFIG_DIR);
    let env_name = std::env::var("NIWA_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = config_dir.join("config.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path.as_path()).required(false));
    }

    let env_config_path = config_dir.join(format!("{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path.as_path()).required(false));
    }

    Ok(builder)
}

/// Write the default configuration to `.niwa/config.toml` unless the file exists.
/// Returns the path when a file was written.
pub fn write_default_config(workspace_root: &Path) -> Result<Option<PathBuf>, NiwaError> {
    let path = workspace_root.join(CONFIG_DIR).join("config.toml");
    if path.exists() {
        return Ok(None);
    }
    let body = toml::to_string_pretty(&NiwaConfig::default())
        .map_err(|e| NiwaError::ConfigError(format!("Failed to render default config: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::IoError)?;
    }
    std::fs::write(&path, body).map_err(StorageError::IoError)?;
    Ok(Some(path))
}
