//! Config parsing
//!
//! TOML is the primary format; JSON is accepted as well.

use contracts::{MergeConfig, MergeError};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub fn parse_toml(content: &str) -> Result<MergeConfig, MergeError> {
    toml::from_str(content).map_err(|e| MergeError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<MergeConfig, MergeError> {
    serde_json::from_str(content).map_err(|e| MergeError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<MergeConfig, MergeError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::AlignmentMode;

    #[test]
    fn test_parse_toml_with_custom_streams() {
        let content = r#"
target_frequency_hz = 8
alignment = "coincident"
input_dir = "data/raw"

[[streams]]
name = "HR"
columns = ["HR"]
frequency_hz = 1
merge_order = 1

[[streams]]
name = "RESP"
timestamp_column = "time"
columns = ["RESP"]
frequency_hz = 8
merge_order = 2
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.target_frequency_hz, 8);
        assert_eq!(config.alignment, AlignmentMode::Coincident);
        assert_eq!(config.streams.len(), 2);
        assert_eq!(config.streams[0].timestamp_column, "timestamp");
        assert_eq!(config.streams[1].timestamp_column, "time");
    }

    #[test]
    fn test_parse_empty_toml_uses_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.target_frequency_hz, 4);
        assert_eq!(config.streams.len(), 5);
    }

    #[test]
    fn test_parse_json_minimal() {
        let config = parse_json(r#"{ "input_dir": "in", "output_dir": "out" }"#).unwrap();
        assert_eq!(config.output_dir().to_str(), Some("out"));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let err = parse_toml("invalid toml [[[").unwrap_err();
        assert!(matches!(err, MergeError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_alignment_rejected() {
        let err = parse_toml(r#"alignment = "nearest""#).unwrap_err();
        assert!(matches!(err, MergeError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
