//! Config validation
//!
//! Rules:
//! - numeric ranges (derive, see `MergeConfig`)
//! - target frequency has an exact microsecond period
//! - catalog: unique names and merge ranks, no substring names, valid frequencies
//! - every stream commensurate with the target grid
//! - input directory set

use contracts::{MergeConfig, MergeError};
use validator::Validate;

/// Validate a parsed MergeConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &MergeConfig) -> Result<(), MergeError> {
    validate_ranges(config)?;
    validate_target_frequency(config)?;
    validate_catalog(config)?;
    validate_paths(config)?;
    Ok(())
}

/// Field-level rules declared on the config structs
fn validate_ranges(config: &MergeConfig) -> Result<(), MergeError> {
    config.validate().map_err(|errors| {
        let mut fields: Vec<String> = errors.errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        MergeError::config_validation(fields.join(", "), errors.to_string())
    })
}

fn validate_target_frequency(config: &MergeConfig) -> Result<(), MergeError> {
    config.target_frequency().map(|_| ())
}

/// Build the catalog once to run its structural checks and the grid check
fn validate_catalog(config: &MergeConfig) -> Result<(), MergeError> {
    config.catalog().map(|_| ())
}

fn validate_paths(config: &MergeConfig) -> Result<(), MergeError> {
    if config.input_dir.as_os_str().is_empty() {
        return Err(MergeError::config_validation(
            "input_dir",
            "input directory cannot be empty",
        ));
    }
    if let Some(output) = &config.output_dir {
        if output.as_os_str().is_empty() {
            return Err(MergeError::config_validation(
                "output_dir",
                "output directory cannot be empty when set",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{default_stream_specs, StreamSpec};
    use std::path::PathBuf;

    fn stream(name: &str, hz: u32, merge_order: u32) -> StreamSpec {
        StreamSpec {
            name: name.into(),
            timestamp_column: "timestamp".into(),
            columns: vec![name.into()],
            frequency_hz: hz,
            merge_order,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&MergeConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_target_rejected() {
        let config = MergeConfig {
            target_frequency_hz: 0,
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("target_frequency_hz"));
    }

    #[test]
    fn test_inexact_target_rejected() {
        let config = MergeConfig {
            target_frequency_hz: 3,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_incommensurate_stream_rejected() {
        let mut streams = default_stream_specs();
        streams.push(stream("RESP", 5, 6));
        let config = MergeConfig {
            streams,
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("RESP"));
    }

    #[test]
    fn test_empty_stream_columns_rejected() {
        let mut bad = stream("RESP", 4, 6);
        bad.columns.clear();
        let config = MergeConfig {
            streams: vec![bad],
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_stream_name_rejected() {
        let config = MergeConfig {
            streams: vec![stream("HR", 1, 1), stream("HR", 1, 2)],
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let config = MergeConfig {
            streams: Vec::new(),
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_output_dir_rejected() {
        let config = MergeConfig {
            output_dir: Some(PathBuf::new()),
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, MergeError::ConfigValidation { ref field, .. } if field == "output_dir"));
    }
}
