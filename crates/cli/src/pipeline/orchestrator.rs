//! Batch orchestrator.
//!
//! Discovers participants, then merges each one on a blocking worker with at
//! most `max_workers` in flight.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{MergeConfig, StreamCatalog};
use ingestion::discover;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use super::job::ParticipantJob;
use super::stats::PipelineStats;

/// Runs one batch over the input directory
pub struct Orchestrator {
    config: Arc<MergeConfig>,
    catalog: Arc<StreamCatalog>,
    dry_run: bool,
}

impl Orchestrator {
    /// Build from a validated config.
    pub fn new(config: MergeConfig, dry_run: bool) -> Result<Self> {
        let catalog = config.catalog().context("Invalid stream catalog")?;
        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            dry_run,
        })
    }

    /// Merge every discovered participant.
    ///
    /// A failing participant is recorded in the returned stats and does not
    /// stop the others.
    #[instrument(
        name = "orchestrator",
        skip(self),
        fields(input = %self.config.input_dir.display(), dry_run = self.dry_run)
    )]
    pub async fn run(self) -> Result<PipelineStats> {
        let start = Instant::now();
        let mut stats = PipelineStats::default();

        let input_dir = self.config.input_dir.clone();
        let catalog = Arc::clone(&self.catalog);
        let participants = tokio::task::spawn_blocking(move || discover(&input_dir, &catalog))
            .await
            .context("Discovery task failed")?
            .with_context(|| format!("Failed to scan {}", self.config.input_dir.display()))?;

        stats.participants_found = participants.len();
        if participants.is_empty() {
            warn!("no participant inputs found");
            stats.duration = start.elapsed();
            return Ok(stats);
        }

        info!(
            participants = participants.len(),
            workers = self.config.max_workers,
            output = %self.config.output_dir().display(),
            "starting merge"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut jobs = JoinSet::new();
        for (participant, files) in participants {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .context("Worker pool closed")?;
            let job = ParticipantJob::new(
                participant,
                files,
                Arc::clone(&self.config),
                Arc::clone(&self.catalog),
                self.dry_run,
            );
            jobs.spawn_blocking(move || {
                let _permit = permit;
                job.run()
            });
        }

        let mut lost = 0usize;
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(outcome) => stats.record(outcome),
                Err(e) => {
                    lost += 1;
                    stats.record_lost(format!("<worker {lost}>"), e);
                }
            }
        }

        stats.duration = start.elapsed();
        stats.log_summary();
        Ok(stats)
    }
}
