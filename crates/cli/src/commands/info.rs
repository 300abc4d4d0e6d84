//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{MergeConfig, MergeLayout, StreamCatalog};
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::InfoArgs;

/// Effective configuration for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    source: String,
    version: String,
    target_frequency_hz: u32,
    alignment: String,
    input_dir: String,
    output_dir: String,
    sort_inputs: bool,
    strict_columns: bool,
    max_workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    participant_timeout_s: Option<u64>,
    streams: Vec<StreamInfo>,
    /// MERGED header when every stream is present
    merged_header: Vec<String>,
}

#[derive(Serialize)]
struct StreamInfo {
    name: String,
    merge_order: u32,
    frequency_hz: u32,
    /// Grid the stream's samples are kept on
    alignment_hz: u32,
    timestamp_column: String,
    columns: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let source = match &args.config {
        Some(path) => path.display().to_string(),
        None => "built-in defaults".to_string(),
    };
    info!(source = %source, "Loading configuration info");

    let config = load_config(args.config.as_deref())?;
    let catalog = config.catalog().context("Invalid stream catalog")?;
    let info = build_config_info(&config, &catalog, source)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(
    config: &MergeConfig,
    catalog: &StreamCatalog,
    source: String,
) -> Result<ConfigInfo> {
    let target = config.target_frequency()?;

    let streams = catalog
        .iter()
        .map(|d| StreamInfo {
            name: d.name.to_string(),
            merge_order: d.merge_order,
            frequency_hz: d.frequency.hz(),
            alignment_hz: d.alignment_frequency(target).hz(),
            timestamp_column: d.timestamp_column.clone(),
            columns: d.columns.clone(),
        })
        .collect();

    let layout = MergeLayout {
        data_columns: catalog.iter().flat_map(|d| d.columns.iter().cloned()).collect(),
        provenance_columns: MergeLayout::provenance_for(catalog),
    };

    Ok(ConfigInfo {
        source,
        version: format!("{:?}", config.version),
        target_frequency_hz: target.hz(),
        alignment: format!("{:?}", config.alignment),
        input_dir: config.input_dir.display().to_string(),
        output_dir: config.output_dir().display().to_string(),
        sort_inputs: config.sort_inputs,
        strict_columns: config.strict_columns,
        max_workers: config.max_workers,
        participant_timeout_s: config.participant_timeout().map(|t| t.as_secs()),
        streams,
        merged_header: layout.merged_header(),
    })
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== physio-merge configuration ({}) ===\n", info.source);

    println!("Batch");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Target: {} Hz ({})", info.target_frequency_hz, info.alignment);
    println!("   ├─ Input: {}", info.input_dir);
    println!("   ├─ Output: {}", info.output_dir);
    println!("   ├─ Presort: {}", if info.sort_inputs { "on" } else { "off" });
    println!("   ├─ Strict columns: {}", info.strict_columns);
    println!("   ├─ Workers: {}", info.max_workers);
    match info.participant_timeout_s {
        Some(secs) => println!("   └─ Timeout: {secs}s"),
        None => println!("   └─ Timeout: none"),
    }

    println!("\nStreams ({})", info.streams.len());
    for (i, stream) in info.streams.iter().enumerate() {
        let prefix = if i == info.streams.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} #{} {} ({} Hz, kept at {} Hz) [{}] {}",
            prefix,
            stream.merge_order,
            stream.name,
            stream.frequency_hz,
            stream.alignment_hz,
            stream.timestamp_column,
            stream.columns.join(", ")
        );
    }

    println!("\nMERGED header");
    println!("   {}", info.merged_header.join(","));
    println!();
}
