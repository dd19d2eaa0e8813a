//! Global config file source: $XDG_CONFIG_HOME/niwa/config.toml or ~/.config/niwa/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::PathBuf;
use tracing::debug;

/// Path to global config file.
pub fn global_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("niwa").join("config.toml"))
}

/// Add global config file source to builder if it exists.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if let Some(path) = global_config_path() {
        if path.exists() {
            debug!(config_path = %path.display(), "Using global config");
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
    }
    Ok(builder)
}
