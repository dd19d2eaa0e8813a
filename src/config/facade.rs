//! Config loader: layers defaults, files and environment into a `NiwaConfig`.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::NiwaConfig;
use config::{ConfigError, Environment, File};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files,
    /// `NIWA__SECTION__KEY` environment variables.
    pub fn load(workspace_root: &Path) -> Result<NiwaConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        builder
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Load from one explicit file instead of the global and workspace files.
    pub fn load_from_file(path: &Path) -> Result<NiwaConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Defaults only, ignoring files and environment.
    pub fn defaults() -> Result<NiwaConfig, ConfigError> {
        merge_policy::builder_with_defaults()?.build()?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("NIWA")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
