//! One participant's merge, run on a blocking worker thread.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{AlignedSource, MergeConfig, MergeError, MergeReport, StreamCatalog};
use ingestion::{sort_file, CursorOptions, DiscoveredFile, SortOutcome, StreamCursor};
use sinks::{debug_path, merged_path, CsvSink, LogSink};
use sync_engine::{EngineConfig, MergeEngine};
use tracing::{debug, info, info_span, warn};

/// Everything a worker needs; the catalog and config are shared read-only
pub struct ParticipantJob {
    participant: String,
    files: Vec<DiscoveredFile>,
    config: Arc<MergeConfig>,
    catalog: Arc<StreamCatalog>,
    dry_run: bool,
}

/// Result of one job, reported back to the orchestrator
#[derive(Debug)]
pub struct JobOutcome {
    pub participant: String,
    pub elapsed: Duration,
    pub result: Result<MergeReport, MergeError>,
}

impl ParticipantJob {
    pub fn new(
        participant: String,
        files: Vec<DiscoveredFile>,
        config: Arc<MergeConfig>,
        catalog: Arc<StreamCatalog>,
        dry_run: bool,
    ) -> Self {
        Self {
            participant,
            files,
            config,
            catalog,
            dry_run,
        }
    }

    /// Presort, open cursors, merge. Never panics on bad input.
    pub fn run(self) -> JobOutcome {
        let started = Instant::now();
        let span = info_span!("participant", participant = %self.participant);
        let result = span.in_scope(|| self.merge(started));
        JobOutcome {
            participant: self.participant,
            elapsed: started.elapsed(),
            result,
        }
    }

    fn merge(&self, started: Instant) -> Result<MergeReport, MergeError> {
        if self.config.sort_inputs {
            for file in &self.files {
                let outcome = sort_file(&file.path, &file.descriptor)?;
                observability::record_presort(matches!(outcome, SortOutcome::Rewritten { .. }));
            }
        }

        let engine_config = EngineConfig::from_merge_config(&self.config, started)?;
        let options =
            CursorOptions::new(engine_config.target).strict(self.config.strict_columns);
        let mut sources: Vec<Box<dyn AlignedSource>> = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let cursor =
                StreamCursor::open_path(&file.path, Arc::clone(&file.descriptor), &options)?;
            sources.push(Box::new(cursor));
        }
        let engine = MergeEngine::new(Arc::clone(&self.catalog), sources, engine_config)?;
        debug!(columns = ?engine.layout().data_columns, "engine ready");

        if self.dry_run {
            let mut sink = LogSink::new(format!("dry-run:{}", self.participant));
            let report = engine.run(&mut sink)?;
            info!(
                rows = report.rows_written,
                dropped = report.rows_dropped(),
                "participant merged (dry run)"
            );
            return Ok(report);
        }

        let out_dir = self.config.output_dir();
        let result = CsvSink::create(out_dir, &self.participant)
            .and_then(|mut sink| engine.run(&mut sink));
        match result {
            Ok(report) => {
                info!(
                    destination = %merged_path(out_dir, &self.participant).display(),
                    rows = report.rows_written,
                    dropped = report.rows_dropped(),
                    stopped_by = ?report.stopped_by,
                    "participant merged"
                );
                Ok(report)
            }
            Err(e) => {
                remove_partial_output(out_dir, &self.participant);
                Err(e)
            }
        }
    }
}

/// Tables of a failed merge are incomplete; don't leave them behind
fn remove_partial_output(dir: &Path, participant: &str) {
    for path in [merged_path(dir, participant), debug_path(dir, participant)] {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed partial output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial output"),
        }
    }
}

/// Metrics label for a failure
pub fn error_kind(error: &MergeError) -> &'static str {
    match error {
        MergeError::DeadlineExceeded { .. } => "deadline",
        MergeError::SinkWrite { .. } => "sink",
        MergeError::Io(_) => "io",
        MergeError::ConfigParse { .. } | MergeError::ConfigValidation { .. } => "config",
        e if e.is_stream_error() => "stream",
        _ => "merge",
    }
}
