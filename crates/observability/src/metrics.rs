//! Merge metrics
//!
//! Per-participant recording into the global `metrics` recorder, plus an
//! in-memory aggregator for the end-of-run summary.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::MergeReport;
use metrics::{counter, gauge, histogram};

/// Record one participant's successful merge.
pub fn record_participant_merged(report: &MergeReport, elapsed: Duration) {
    counter!("physio_merge_participants_total", "status" => "ok").increment(1);
    histogram!("physio_merge_participant_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
    gauge!("physio_merge_last_rows_written").set(report.rows_written as f64);
    gauge!("physio_merge_last_acceptance_ratio").set(report.acceptance_ratio());
}

/// Record a participant that failed; `kind` is a short error class label.
pub fn record_participant_failed(kind: &'static str) {
    counter!("physio_merge_participants_total", "status" => "failed").increment(1);
    counter!("physio_merge_failures_total", "kind" => kind).increment(1);
}

/// Record the outcome of presorting one input
pub fn record_presort(rewritten: bool) {
    let outcome = if rewritten { "rewritten" } else { "already_sorted" };
    counter!("physio_merge_presort_total", "outcome" => outcome).increment(1);
}

/// Batch-level aggregator
#[derive(Debug, Clone, Default)]
pub struct MergeMetricsAggregator {
    pub participants_ok: u64,
    pub participants_failed: u64,
    pub rows_written: u64,
    pub rows_dropped_misaligned: u64,
    pub rows_dropped_width: u64,
    pub instants_visited: u64,
    /// Acceptance ratio per participant
    pub acceptance_stats: RunningStats,
    /// Wall time per participant (ms)
    pub duration_stats: RunningStats,
    /// Early stops keyed by the stream that ran dry
    pub stopped_by: BTreeMap<String, u64>,
    /// Failed participants with their error
    pub failures: BTreeMap<String, String>,
}

impl MergeMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &MergeReport, elapsed: Duration) {
        self.participants_ok += 1;
        self.rows_written += report.rows_written;
        self.rows_dropped_misaligned += report.rows_dropped_misaligned;
        self.rows_dropped_width += report.rows_dropped_width;
        self.instants_visited += report.instants_visited;
        self.acceptance_stats.push(report.acceptance_ratio());
        self.duration_stats.push(elapsed.as_secs_f64() * 1000.0);
        if let Some(stream) = &report.stopped_by {
            *self.stopped_by.entry(stream.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_failure(&mut self, participant: impl Into<String>, error: impl ToString) {
        self.participants_failed += 1;
        self.failures.insert(participant.into(), error.to_string());
    }

    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            participants_ok: self.participants_ok,
            participants_failed: self.participants_failed,
            rows_written: self.rows_written,
            rows_dropped: self.rows_dropped_misaligned + self.rows_dropped_width,
            drop_rate: if self.instants_visited > 0 {
                (self.rows_dropped_misaligned + self.rows_dropped_width) as f64
                    / self.instants_visited as f64
                    * 100.0
            } else {
                0.0
            },
            acceptance_ratio: StatsSummary::from(&self.acceptance_stats),
            duration_ms: StatsSummary::from(&self.duration_stats),
            stopped_by: self.stopped_by.clone(),
            failures: self.failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// End-of-run summary
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    pub participants_ok: u64,
    pub participants_failed: u64,
    pub rows_written: u64,
    pub rows_dropped: u64,
    pub drop_rate: f64,
    pub acceptance_ratio: StatsSummary,
    pub duration_ms: StatsSummary,
    pub stopped_by: BTreeMap<String, u64>,
    pub failures: BTreeMap<String, String>,
}

impl std::fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Merge Summary ===")?;
        writeln!(
            f,
            "Participants: {} merged, {} failed",
            self.participants_ok, self.participants_failed
        )?;
        writeln!(f, "Rows written: {}", self.rows_written)?;
        writeln!(f, "Rows dropped: {} ({:.2}%)", self.rows_dropped, self.drop_rate)?;
        writeln!(f, "Acceptance ratio: {}", self.acceptance_ratio)?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;

        if !self.stopped_by.is_empty() {
            writeln!(f, "Early stops:")?;
            for (stream, count) in &self.stopped_by {
                writeln!(f, "  {stream}: {count}")?;
            }
        }
        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (participant, error) in &self.failures {
                writeln!(f, "  {participant}: {error}")?;
            }
        }
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
