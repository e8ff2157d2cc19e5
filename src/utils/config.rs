//! Configuration and constants for composing ensembles.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current persisted schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Index level holding call-path nodes
pub const NODE_LEVEL: &str = "node";

/// Index level holding profile ids (or join keys after a columnar join)
pub const PROFILE_LEVEL: &str = "profile";

/// Display-name column carried by every measurement table
pub const NAME_COLUMN: &str = "name";

/// Metadata column recording the original profile id after a columnar join
pub const SOURCE_PROFILE_COLUMN: &str = "profile";

/// Options shared by both composition strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeOptions {
    /// Materialize every (node, profile) pair when stacking
    pub fill_missing: bool,

    /// Log each unification step at info level instead of debug
    pub progress: bool,

    /// Name of the display-name column
    pub name_column: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            fill_missing: true,
            progress: false,
            name_column: NAME_COLUMN.to_string(),
        }
    }
}

impl ComposeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_missing(mut self, fill_missing: bool) -> Self {
        self.fill_missing = fill_missing;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_name_column(mut self, name_column: impl Into<String>) -> Self {
        self.name_column = name_column.into();
        self
    }

    /// Reject options that cannot describe a valid table
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.name_column.is_empty() {
            return Err(ConfigError::Invalid("name column cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Load compose options from a TOML file
///
/// Missing keys fall back to [`ComposeOptions::default`].
///
/// # Errors
/// * `ConfigError::IoError` - If file cannot be read
/// * `ConfigError::ParseFailed` - If TOML is invalid
/// * `ConfigError::Invalid` - If the options are inconsistent
///
/// # Example
/// ```ignore
/// let options = load_options("ensemble.toml")?;
/// ```
pub fn load_options(path: impl AsRef<Path>) -> Result<ComposeOptions, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let options: ComposeOptions = toml::from_str(&contents)?;
    options.check()?;
    Ok(options)
}
