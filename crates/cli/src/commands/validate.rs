//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::MergeConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    target_frequency_hz: u32,
    alignment: String,
    input_dir: String,
    output_dir: String,
    stream_count: usize,
    max_workers: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    target_frequency_hz: config.target_frequency_hz,
                    alignment: format!("{:?}", config.alignment),
                    input_dir: config.input_dir.display().to_string(),
                    output_dir: config.output_dir().display().to_string(),
                    stream_count: config.streams.len(),
                    max_workers: config.max_workers,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &MergeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.input_dir.is_dir() {
        warnings.push(format!(
            "input_dir '{}' does not exist yet",
            config.input_dir.display()
        ));
    }

    if config.output_dir.is_none() {
        warnings.push("output_dir not set - tables are written into input_dir".to_string());
    }

    if config.sort_inputs {
        warnings.push("sort_inputs is on - out-of-order inputs are rewritten in place".to_string());
    }

    for stream in &config.streams {
        if stream.frequency_hz > config.target_frequency_hz {
            warnings.push(format!(
                "stream '{}' ({} Hz) is decimated to {} Hz",
                stream.name, stream.frequency_hz, config.target_frequency_hz
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Target: {} Hz ({})", summary.target_frequency_hz, summary.alignment);
            println!("  Input: {}", summary.input_dir);
            println!("  Output: {}", summary.output_dir);
            println!("  Streams: {}", summary.stream_count);
            println!("  Workers: {}", summary.max_workers);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
