//! LogSink - traces rows via tracing without persisting them

use contracts::{MergeError, MergeLayout, MergeRow, RowSink};
use tracing::{info, instrument, trace};

/// Sink that counts rows and logs a summary (used for dry runs)
pub struct LogSink {
    name: String,
    columns: usize,
    rows: u64,
    first: Option<MergeRow>,
    last: Option<MergeRow>,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: 0,
            rows: 0,
            first: None,
            last: None,
        }
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl RowSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin(&mut self, layout: &MergeLayout) -> Result<(), MergeError> {
        self.columns = layout.width();
        info!(sink = %self.name, header = ?layout.merged_header(), "dry run, tables not written");
        Ok(())
    }

    #[instrument(
        name = "log_sink_write",
        level = "trace",
        skip(self, row),
        fields(sink = %self.name, timestamp = %row.timestamp)
    )]
    fn write(&mut self, row: &MergeRow) -> Result<(), MergeError> {
        trace!(values = ?row.values, provenance = ?row.provenance, "row");
        if self.first.is_none() {
            self.first = Some(row.clone());
        }
        self.last = Some(row.clone());
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, MergeError> {
        info!(
            sink = %self.name,
            rows = self.rows,
            columns = self.columns,
            first = ?self.first.as_ref().map(|r| r.timestamp.to_string()),
            last = ?self.last.as_ref().map(|r| r.timestamp.to_string()),
            "dry run finished"
        );
        Ok(self.rows)
    }
}
