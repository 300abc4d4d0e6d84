//! Batch statistics.

use std::time::Duration;

use contracts::MergeError;
use observability::MergeMetricsAggregator;
use tracing::{error, info};

use super::job::{error_kind, JobOutcome};

/// Statistics from one batch run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Participants found by discovery
    pub participants_found: usize,

    /// Wall time of the whole batch
    pub duration: Duration,

    /// Per-participant reports folded together
    pub merge_metrics: MergeMetricsAggregator,
}

impl PipelineStats {
    /// Fold a finished job into the totals and the global recorder
    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome.result {
            Ok(report) => {
                observability::record_participant_merged(&report, outcome.elapsed);
                self.merge_metrics.update(&report, outcome.elapsed);
            }
            Err(e) => self.record_failure(outcome.participant, &e),
        }
    }

    pub fn record_failure(&mut self, participant: String, e: &MergeError) {
        error!(participant = %participant, error = %e, "participant failed");
        observability::record_participant_failed(error_kind(e));
        self.merge_metrics.record_failure(participant, e);
    }

    /// A worker that died without reporting
    pub fn record_lost(&mut self, label: String, e: impl std::fmt::Display) {
        error!(task = %label, error = %e, "merge task panicked");
        observability::record_participant_failed("panic");
        self.merge_metrics.record_failure(label, e);
    }

    pub fn merged(&self) -> u64 {
        self.merge_metrics.participants_ok
    }

    pub fn failed(&self) -> u64 {
        self.merge_metrics.participants_failed
    }

    /// Rows per second across the batch
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.merge_metrics.rows_written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!(
            participants = self.participants_found,
            merged = self.merged(),
            failed = self.failed(),
            rows_written = self.merge_metrics.rows_written,
            duration_secs = self.duration.as_secs_f64(),
            rows_per_sec = format!("{:.1}", self.throughput()),
            "batch finished"
        );
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Batch Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Participants found: {}", self.participants_found);
        println!("   ├─ Rows written: {}", self.merge_metrics.rows_written);
        println!("   └─ Rows/s: {:.1}", self.throughput());
        println!();
        print!("{}", self.merge_metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MergeReport;

    fn ok(participant: &str, rows: u64) -> JobOutcome {
        JobOutcome {
            participant: participant.into(),
            elapsed: Duration::from_millis(20),
            result: Ok(MergeReport {
                rows_written: rows,
                instants_visited: rows + 1,
                rows_dropped_misaligned: 1,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_record_counts_both_outcomes() {
        let mut stats = PipelineStats {
            participants_found: 3,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        stats.record(ok("S1_", 10));
        stats.record(ok("S2_", 30));
        stats.record(JobOutcome {
            participant: "S3_".into(),
            elapsed: Duration::from_millis(1),
            result: Err(MergeError::NoStreams),
        });

        assert_eq!(stats.merged(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.merge_metrics.rows_written, 40);
        assert!((stats.throughput() - 20.0).abs() < 1e-9);
        assert!(stats.merge_metrics.failures.contains_key("S3_"));
    }

    #[test]
    fn test_zero_duration_throughput() {
        assert_eq!(PipelineStats::default().throughput(), 0.0);
    }
}
