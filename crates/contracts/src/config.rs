//! MergeConfig - Config Loader output
//!
//! Describes one batch run: where the recordings live, the output grid, the
//! alignment rule and the stream catalog.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

use crate::{
    default_stream_specs, Frequency, MergeError, StreamCatalog, DEFAULT_TARGET_FREQUENCY,
    DEFAULT_TIMESTAMP_COLUMN,
};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// How a stream's current sample is matched against the merge instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Sample lies within one native period of the instant
    #[default]
    Tolerance,
    /// Sample timestamp equals the instant
    Coincident,
}

/// Complete batch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MergeConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Output grid frequency (Hz)
    #[serde(default = "default_target_frequency_hz")]
    #[validate(range(min = 1, max = 1_000_000))]
    pub target_frequency_hz: u32,

    /// Alignment rule
    #[serde(default)]
    pub alignment: AlignmentMode,

    /// Directory scanned for raw recordings
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Where MERGED/DEBUG tables go (defaults to `input_dir`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Sort raw files by timestamp before merging
    #[serde(default = "default_true")]
    pub sort_inputs: bool,

    /// Fail when a declared data column is missing instead of narrowing
    #[serde(default)]
    pub strict_columns: bool,

    /// Participants merged concurrently
    #[serde(default = "default_max_workers")]
    #[validate(range(min = 1, max = 1024))]
    pub max_workers: usize,

    /// Per-participant deadline in seconds (0 = none)
    #[serde(default)]
    pub participant_timeout_s: u64,

    /// Stream catalog
    #[serde(default = "default_stream_specs")]
    #[validate(nested)]
    pub streams: Vec<StreamSpec>,
}

/// One catalog entry as written in config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StreamSpec {
    /// Type name and filename token
    #[validate(length(min = 1))]
    pub name: String,

    /// Header name of the timestamp column
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    /// Declared data columns
    #[validate(length(min = 1))]
    pub columns: Vec<String>,

    /// Native sampling frequency (Hz)
    #[validate(range(min = 1, max = 1_000_000))]
    pub frequency_hz: u32,

    /// Rank in merged rows
    pub merge_order: u32,
}

fn default_target_frequency_hz() -> u32 {
    DEFAULT_TARGET_FREQUENCY.hz()
}

fn default_input_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_timestamp_column() -> String {
    DEFAULT_TIMESTAMP_COLUMN.to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::default(),
            target_frequency_hz: default_target_frequency_hz(),
            alignment: AlignmentMode::default(),
            input_dir: default_input_dir(),
            output_dir: None,
            sort_inputs: true,
            strict_columns: false,
            max_workers: default_max_workers(),
            participant_timeout_s: 0,
            streams: default_stream_specs(),
        }
    }
}

impl MergeConfig {
    /// Effective output directory
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }

    /// Output grid frequency
    pub fn target_frequency(&self) -> Result<Frequency, MergeError> {
        Frequency::new(self.target_frequency_hz).map_err(|_| {
            MergeError::config_validation(
                "target_frequency_hz",
                format!(
                    "{} Hz must be > 0 and divide 1000000 exactly",
                    self.target_frequency_hz
                ),
            )
        })
    }

    /// Validated catalog built from `streams`
    pub fn catalog(&self) -> Result<StreamCatalog, MergeError> {
        let catalog = StreamCatalog::from_specs(&self.streams)?;
        catalog.check_target(self.target_frequency()?)?;
        Ok(catalog)
    }

    /// Per-participant deadline
    pub fn participant_timeout(&self) -> Option<Duration> {
        (self.participant_timeout_s > 0).then(|| Duration::from_secs(self.participant_timeout_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.target_frequency_hz, 4);
        assert_eq!(config.alignment, AlignmentMode::Tolerance);
        assert_eq!(config.output_dir(), Path::new("."));
        assert!(config.participant_timeout().is_none());
        assert_eq!(config.catalog().unwrap().len(), 5);
    }

    #[test]
    fn test_output_dir_override() {
        let config = MergeConfig {
            input_dir: PathBuf::from("raw"),
            output_dir: Some(PathBuf::from("merged")),
            ..Default::default()
        };
        assert_eq!(config.output_dir(), Path::new("merged"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: MergeConfig =
            serde_json::from_str(r#"{ "alignment": "coincident", "participant_timeout_s": 30 }"#)
                .unwrap();
        assert_eq!(config.alignment, AlignmentMode::Coincident);
        assert_eq!(config.participant_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.streams.len(), 5);
        assert!(config.sort_inputs);
    }

    #[test]
    fn test_range_validation() {
        let config = MergeConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
