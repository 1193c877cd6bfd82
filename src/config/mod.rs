//! Run configuration: defaults, an optional TOML file, CLI overrides.

mod types;
mod validation;

pub use types::{CliOverrides, FileConfig, Settings};
pub use validation::{validate, validate_id_range};

use crate::ConfigError;
use std::path::Path;

/// Loads the optional TOML configuration file from the given path.
///
/// The file mirrors the global CLI flags; CLI values take precedence over
/// it, and it over the built-in defaults.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
