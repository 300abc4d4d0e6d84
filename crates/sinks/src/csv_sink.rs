//! CsvSink - writes a participant's MERGED and DEBUG tables

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{format_seconds, MergeError, MergeLayout, MergeRow, RowSink};
use csv::{StringRecord, Writer};
use tracing::{debug, error, instrument};

/// `<dir>/<participant>MERGED.csv`
pub fn merged_path(dir: &Path, participant: &str) -> PathBuf {
    dir.join(format!("{participant}MERGED.csv"))
}

/// `<dir>/<participant>DEBUG.csv`
pub fn debug_path(dir: &Path, participant: &str) -> PathBuf {
    dir.join(format!("{participant}DEBUG.csv"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Open { width: usize, slots: usize },
    Finished,
}

/// Sink writing two CSV tables
///
/// The DEBUG table repeats every MERGED column and appends one source-line
/// column per catalog stream.
pub struct CsvSink<W: Write> {
    name: String,
    merged: Writer<W>,
    debug: Writer<W>,
    record: StringRecord,
    state: State,
    rows: u64,
}

impl<W: Write> CsvSink<W> {
    pub fn new(name: impl Into<String>, merged: W, debug: W) -> Self {
        Self {
            name: name.into(),
            merged: Writer::from_writer(merged),
            debug: Writer::from_writer(debug),
            record: StringRecord::new(),
            state: State::Created,
            rows: 0,
        }
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn write_err(&self, e: impl std::fmt::Display) -> MergeError {
        error!(sink = %self.name, error = %e, "write failed");
        MergeError::sink_write(&self.name, e.to_string())
    }

    /// Unwrap both writers after `finish`
    pub fn into_inner(self) -> Result<(W, W), MergeError> {
        let name = self.name;
        let merged = self
            .merged
            .into_inner()
            .map_err(|e| MergeError::sink_write(&name, e.to_string()))?;
        let debug = self
            .debug
            .into_inner()
            .map_err(|e| MergeError::sink_write(&name, e.to_string()))?;
        Ok((merged, debug))
    }
}

impl CsvSink<BufWriter<File>> {
    /// Create both tables for `participant` under `dir`.
    pub fn create(dir: &Path, participant: &str) -> Result<Self, MergeError> {
        std::fs::create_dir_all(dir)?;
        let merged = File::create(merged_path(dir, participant))?;
        let debug = File::create(debug_path(dir, participant))?;
        Ok(Self::new(
            format!("csv:{participant}"),
            BufWriter::new(merged),
            BufWriter::new(debug),
        ))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "csv_sink_begin", skip_all, fields(sink = %self.name))]
    fn begin(&mut self, layout: &MergeLayout) -> Result<(), MergeError> {
        if self.state != State::Created {
            return Err(MergeError::sink_write(&self.name, "begin called twice"));
        }
        self.merged
            .write_record(layout.merged_header())
            .map_err(|e| self.write_err(e))?;
        self.debug
            .write_record(layout.debug_header())
            .map_err(|e| self.write_err(e))?;
        self.state = State::Open {
            width: layout.width(),
            slots: layout.provenance_columns.len(),
        };
        Ok(())
    }

    fn write(&mut self, row: &MergeRow) -> Result<(), MergeError> {
        let State::Open { width, slots } = self.state else {
            return Err(MergeError::sink_write(&self.name, "sink is not open"));
        };
        if row.values.len() != width || row.provenance.len() != slots {
            return Err(MergeError::sink_write(
                &self.name,
                format!(
                    "row shape {}+{} does not match header {width}+{slots}",
                    row.values.len(),
                    row.provenance.len()
                ),
            ));
        }

        self.record.clear();
        self.record.push_field(&format_seconds(row.timer_offset));
        self.record.push_field(&row.timestamp.to_string());
        for value in &row.values {
            self.record.push_field(value);
        }
        self.merged
            .write_record(&self.record)
            .map_err(|e| self.write_err(e))?;

        for line in &row.provenance {
            match line {
                Some(line) => self.record.push_field(&line.to_string()),
                None => self.record.push_field(""),
            }
        }
        self.debug
            .write_record(&self.record)
            .map_err(|e| self.write_err(e))?;

        self.rows += 1;
        Ok(())
    }

    #[instrument(name = "csv_sink_finish", skip_all, fields(sink = %self.name))]
    fn finish(&mut self) -> Result<u64, MergeError> {
        if self.state == State::Finished {
            return Err(MergeError::sink_write(&self.name, "sink already finished"));
        }
        self.merged.flush().map_err(|e| self.write_err(e))?;
        self.debug.flush().map_err(|e| self.write_err(e))?;
        self.state = State::Finished;
        metrics::counter!("physio_merge_sink_rows_total", "sink" => "csv").increment(self.rows);
        debug!(rows = self.rows, "tables flushed");
        Ok(self.rows)
    }
}
