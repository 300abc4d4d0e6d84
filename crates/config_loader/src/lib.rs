//! # Config Loader
//!
//! Loads the batch configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate ranges, the stream catalog and grid compatibility
//! - Produce a `MergeConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("physio-merge.toml")).unwrap();
//! println!("target: {} Hz", config.target_frequency_hz);
//! ```

mod parser;
mod validator;

pub use contracts::MergeConfig;
pub use parser::ConfigFormat;

use contracts::MergeError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is detected from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<MergeConfig, MergeError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<MergeConfig, MergeError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate a config built or modified in code (e.g. after CLI overrides)
    pub fn validate(config: &MergeConfig) -> Result<(), MergeError> {
        validator::validate(config)
    }

    pub fn to_toml(config: &MergeConfig) -> Result<String, MergeError> {
        toml::to_string_pretty(config)
            .map_err(|e| MergeError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(config: &MergeConfig) -> Result<String, MergeError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| MergeError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, MergeError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            MergeError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| MergeError::config_parse(format!("unsupported config format: .{ext}")))
    }

    fn read_file(path: &Path) -> Result<String, MergeError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
