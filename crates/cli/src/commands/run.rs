//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{AlignmentMode, MergeConfig};
use tracing::{info, warn};

use super::load_config;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::Orchestrator;

/// Execute the `run` command
pub async fn run_merge(args: &RunArgs) -> Result<()> {
    match &args.config {
        Some(path) => info!(config = %path.display(), "Loading configuration"),
        None => info!("No configuration file given, using built-in defaults"),
    }
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, args);

    // overrides can break what the file alone satisfied
    config_loader::ConfigLoader::validate(&config)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir().display(),
        target_hz = config.target_frequency_hz,
        alignment = ?config.alignment,
        streams = config.streams.len(),
        workers = config.max_workers,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!(port = args.metrics_port, "Prometheus exporter listening");
    }

    let orchestrator = Orchestrator::new(config, args.dry_run)?;
    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        result = orchestrator.run() => {
            let stats = result.context("Batch execution failed")?;
            stats.print_summary();
            if stats.failed() > 0 {
                return Err(CliError::ParticipantsFailed {
                    failed: stats.failed(),
                    total: stats.participants_found as u64,
                }
                .into());
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, waiting for running participants to finish");
            return Err(CliError::Interrupted.into());
        }
    }

    info!("physio-merge finished");
    Ok(())
}

/// CLI flags win over the file
fn apply_overrides(config: &mut MergeConfig, args: &RunArgs) {
    if let Some(input) = &args.input {
        info!(input = %input.display(), "Overriding input directory from CLI");
        config.input_dir = input.clone();
    }
    if let Some(output) = &args.output {
        info!(output = %output.display(), "Overriding output directory from CLI");
        config.output_dir = Some(output.clone());
    }
    if let Some(hz) = args.target_hz {
        info!(target_hz = hz, "Overriding target frequency from CLI");
        config.target_frequency_hz = hz;
    }
    if let Some(jobs) = args.jobs {
        config.max_workers = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.participant_timeout_s = timeout;
    }
    if args.coincident {
        config.alignment = AlignmentMode::Coincident;
    }
    if args.strict_columns {
        config.strict_columns = true;
    }
    if args.no_sort {
        config.sort_inputs = false;
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
///
/// A handler that cannot be installed never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_overrides_apply() {
        let mut config = MergeConfig::default();
        let args = RunArgs {
            input: Some(PathBuf::from("raw")),
            target_hz: Some(8),
            jobs: Some(3),
            timeout: Some(60),
            coincident: true,
            no_sort: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.input_dir, PathBuf::from("raw"));
        assert_eq!(config.output_dir(), PathBuf::from("raw").as_path());
        assert_eq!(config.target_frequency_hz, 8);
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.participant_timeout_s, 60);
        assert_eq!(config.alignment, AlignmentMode::Coincident);
        assert!(!config.sort_inputs);
        assert!(!config.strict_columns);
    }

    #[test]
    fn test_no_flags_keeps_file_values() {
        let mut config = MergeConfig {
            target_frequency_hz: 2,
            ..Default::default()
        };
        let before = config.clone();
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config, before);
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            input: Some(dir.path().to_path_buf()),
            target_hz: Some(3),
            ..Default::default()
        };
        let err = run_merge(&args).await.unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some());
    }
}
