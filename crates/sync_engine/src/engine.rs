//! Multi-stream merge engine.

use std::sync::Arc;
use std::time::Instant;

use contracts::{
    AlignedSource, AlignmentMode, Frequency, MergeConfig, MergeError, MergeLayout, MergeReport,
    MergeRow, RowSink, StreamCatalog, StreamName, StreamUsage, Timestamp,
    DEFAULT_TARGET_FREQUENCY,
};
use tracing::{debug, instrument, trace};

use crate::timer::TimerOffset;

/// Instants between deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Engine configuration
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Output grid frequency
    pub target: Frequency,
    /// Matching rule for a stream's sample against the current instant
    pub alignment: AlignmentMode,
    /// Abort the merge once this instant passes
    pub deadline: Option<Instant>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_FREQUENCY,
            alignment: AlignmentMode::default(),
            deadline: None,
        }
    }
}

impl EngineConfig {
    /// Derive from a batch config; the deadline counts from `started`.
    pub fn from_merge_config(config: &MergeConfig, started: Instant) -> Result<Self, MergeError> {
        Ok(Self {
            target: config.target_frequency()?,
            alignment: config.alignment,
            deadline: config.participant_timeout().map(|t| started + t),
        })
    }
}

/// One input inside the engine
struct Slot {
    /// Index of this stream in the catalog (provenance column)
    catalog_slot: usize,
    name: StreamName,
    native_period: i64,
    source: Box<dyn AlignedSource>,
    live: bool,
}

/// Per-instant assembly result
enum Assembled {
    Complete(MergeRow),
    Missing,
    WidthMismatch(usize),
}

/// Merges one participant's streams onto the output grid
pub struct MergeEngine {
    catalog: Arc<StreamCatalog>,
    config: EngineConfig,
    slots: Vec<Slot>,
    layout: MergeLayout,
}

impl std::fmt::Debug for MergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeEngine")
            .field("config", &self.config)
            .field("streams", &self.slots.iter().map(|s| &s.name).collect::<Vec<_>>())
            .field("layout", &self.layout)
            .finish()
    }
}

impl MergeEngine {
    /// Build an engine over pre-positioned sources.
    ///
    /// # Errors
    /// - `NoStreams` for an empty source set
    /// - `DuplicateStream` when a stream type is supplied twice
    /// - `StreamExhaustedEarly` when a source has no aligned sample
    pub fn new(
        catalog: Arc<StreamCatalog>,
        sources: Vec<Box<dyn AlignedSource>>,
        config: EngineConfig,
    ) -> Result<Self, MergeError> {
        if sources.is_empty() {
            return Err(MergeError::NoStreams);
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(sources.len());
        for source in sources {
            let name = source.descriptor().name.clone();
            let catalog_slot = catalog.slot_of(&name).ok_or_else(|| {
                MergeError::Other(format!("stream '{name}' is not in the catalog"))
            })?;
            if slots.iter().any(|s| s.catalog_slot == catalog_slot) {
                return Err(MergeError::DuplicateStream {
                    stream: name.to_string(),
                });
            }
            if source.current().is_none() {
                return Err(MergeError::StreamExhaustedEarly {
                    stream: name.to_string(),
                });
            }
            slots.push(Slot {
                catalog_slot,
                native_period: source.descriptor().native_period_micros(),
                name,
                source,
                live: true,
            });
        }
        // catalog slots follow merge_order
        slots.sort_by_key(|s| s.catalog_slot);

        let layout = MergeLayout {
            data_columns: slots
                .iter()
                .flat_map(|s| s.source.columns().iter().cloned())
                .collect(),
            provenance_columns: MergeLayout::provenance_for(&catalog),
        };

        Ok(Self {
            catalog,
            config,
            slots,
            layout,
        })
    }

    /// Header description handed to the sink
    pub fn layout(&self) -> &MergeLayout {
        &self.layout
    }

    /// Run the merge to completion, writing accepted rows to `sink`.
    #[instrument(
        name = "merge_engine_run",
        skip_all,
        fields(
            sink = sink.name(),
            streams = self.slots.len(),
            target = %self.config.target,
            alignment = ?self.config.alignment
        )
    )]
    pub fn run<S: RowSink + ?Sized>(mut self, sink: &mut S) -> Result<MergeReport, MergeError> {
        let started = Instant::now();
        let period = self.config.target.period_micros();
        let mut timer = TimerOffset::new(period);
        let mut report = MergeReport::default();

        debug!(columns = ?self.layout.data_columns, "merge started");
        sink.begin(&self.layout)?;

        loop {
            let Some(current) = self.next_instant() else {
                break;
            };

            if report.instants_visited % DEADLINE_CHECK_INTERVAL == 0 {
                self.check_deadline(started, &report)?;
            }
            report.instants_visited += 1;

            let timer_offset = timer.step(current);
            let assembled = self.assemble(current, timer_offset)?;
            let exhausted = self.retire_exhausted();

            match assembled {
                Assembled::Complete(row) => {
                    trace!(timestamp = %current, timer = timer_offset, "row accepted");
                    sink.write(&row)?;
                    report.rows_written += 1;
                }
                Assembled::Missing => {
                    trace!(timestamp = %current, "row dropped: stream without concurrent sample");
                    timer.discard();
                    report.rows_dropped_misaligned += 1;
                }
                Assembled::WidthMismatch(found) => {
                    trace!(
                        timestamp = %current,
                        expected = self.layout.width(),
                        found,
                        "row dropped: width mismatch"
                    );
                    timer.discard();
                    report.rows_dropped_width += 1;
                }
            }

            if let Some(stream) = exhausted {
                if self.slots.iter().any(|s| s.live) {
                    debug!(stream = %stream, "stream exhausted while others remain, stopping");
                    report.stopped_by = Some(stream);
                    break;
                }
            }
        }

        let written = sink.finish()?;
        if written != report.rows_written {
            return Err(MergeError::sink_write(
                sink.name(),
                format!(
                    "sink reported {written} rows, engine wrote {}",
                    report.rows_written
                ),
            ));
        }

        report.streams = self
            .slots
            .iter()
            .map(|s| StreamUsage {
                stream: s.name.clone(),
                lines_consumed: s.source.lines_consumed(),
            })
            .collect();
        self.log_consumption();
        record_metrics(&report);

        debug!(
            rows_written = report.rows_written,
            rows_dropped = report.rows_dropped(),
            instants = report.instants_visited,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "merge finished"
        );
        Ok(report)
    }

    /// Earliest current timestamp among live streams (ties go to merge order)
    fn next_instant(&self) -> Option<Timestamp> {
        self.slots
            .iter()
            .filter(|s| s.live)
            .filter_map(|s| s.source.current().map(|sample| sample.timestamp))
            .min()
    }

    /// Collect each live stream's contribution to the row at `current`
    fn assemble(&mut self, current: Timestamp, timer_offset: i64) -> Result<Assembled, MergeError> {
        let mut values = Vec::with_capacity(self.layout.width());
        let mut provenance = vec![None; self.catalog.len()];
        let mut missing = false;

        for slot in self.slots.iter_mut().filter(|s| s.live) {
            let Some(sample) = slot.source.current() else {
                missing = true;
                continue;
            };
            let delta = sample.timestamp.micros_since(current);
            let matched = match self.config.alignment {
                AlignmentMode::Tolerance => {
                    delta.unsigned_abs() < slot.native_period.unsigned_abs()
                }
                AlignmentMode::Coincident => delta == 0,
            };
            if !matched {
                missing = true;
                continue;
            }

            values.extend(sample.values.iter().cloned());
            provenance[slot.catalog_slot] = Some(slot.source.line_number());
            if delta == 0 {
                slot.source.advance()?;
            }
        }

        if missing {
            return Ok(Assembled::Missing);
        }
        if values.len() != self.layout.width() {
            return Ok(Assembled::WidthMismatch(values.len()));
        }
        Ok(Assembled::Complete(MergeRow {
            timer_offset,
            timestamp: current,
            values,
            provenance,
        }))
    }

    /// Mark drained streams inactive; returns the first one in merge order
    /// that contributed columns to the row
    fn retire_exhausted(&mut self) -> Option<StreamName> {
        let mut first = None;
        for slot in self.slots.iter_mut().filter(|s| s.live) {
            if slot.source.current().is_none() {
                slot.live = false;
                if slot.source.columns().is_empty() {
                    debug!(
                        stream = %slot.name,
                        "stream without data columns exhausted, row width unchanged"
                    );
                } else {
                    first.get_or_insert_with(|| slot.name.clone());
                }
            }
        }
        first
    }

    fn check_deadline(&self, started: Instant, report: &MergeReport) -> Result<(), MergeError> {
        match self.config.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MergeError::DeadlineExceeded {
                elapsed_ms: started.elapsed().as_millis() as u64,
                rows_written: report.rows_written,
            }),
            _ => Ok(()),
        }
    }

    fn log_consumption(&self) {
        for slot in &self.slots {
            debug!(
                stream = %slot.name,
                lines_consumed = slot.source.lines_consumed(),
                total_lines = ?slot.source.total_lines(),
                drained = !slot.live,
                "stream consumption"
            );
        }
    }
}

fn record_metrics(report: &MergeReport) {
    metrics::counter!("physio_merge_rows_total", "status" => "written")
        .increment(report.rows_written);
    metrics::counter!("physio_merge_rows_total", "status" => "dropped_misaligned")
        .increment(report.rows_dropped_misaligned);
    metrics::counter!("physio_merge_rows_total", "status" => "dropped_width")
        .increment(report.rows_dropped_width);
    metrics::counter!("physio_merge_instants_total").increment(report.instants_visited);
    metrics::histogram!("physio_merge_acceptance_ratio").record(report.acceptance_ratio());
    if let Some(stream) = &report.stopped_by {
        metrics::counter!(
            "physio_merge_early_stops_total",
            "stream" => stream.to_string()
        )
        .increment(1);
    }
}
