//! User config file source: $XDG_CONFIG_HOME/docgen/config.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use directories::BaseDirs;
use std::path::PathBuf;
use tracing::debug;

/// Path to the user-level config file, if a home directory can be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("docgen").join("config.toml"))
}

/// Add the user config file to the builder when it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = global_config_path() else {
        return Ok(builder);
    };
    if !path.exists() {
        debug!(config_path = %path.display(), "No user configuration file");
        return Ok(builder);
    }
    debug!(config_path = %path.display(), "Loading user configuration");
    Ok(builder.add_source(File::from(path).required(false)))
}
