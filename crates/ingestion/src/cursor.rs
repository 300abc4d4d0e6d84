//! StreamCursor - forward-only reader of one stream's aligned samples
//!
//! Rows whose timestamp does not sit on the cursor's alignment grid are
//! consumed and skipped. Line numbers are physical 1-based lines of the file
//! (the header is line 1), so blank lines and quoted fields spanning several
//! lines are accounted for.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use contracts::{
    parse_timestamp, AlignedSource, Frequency, MergeError, Sample, StreamDescriptor, Timestamp,
};
use csv::StringRecord;
use tracing::{debug, instrument, warn};

use crate::lines::{line_tracking_reader, record_start_line, NewlineIndex};

/// Options applied when opening a cursor
#[derive(Debug, Clone, Copy)]
pub struct CursorOptions {
    /// Output grid frequency of the merge
    pub target: Frequency,
    /// Fail on a missing declared data column instead of dropping it
    pub strict_columns: bool,
}

impl CursorOptions {
    pub fn new(target: Frequency) -> Self {
        Self {
            target,
            strict_columns: false,
        }
    }

    pub fn strict(mut self, strict_columns: bool) -> Self {
        self.strict_columns = strict_columns;
        self
    }
}

/// Header positions of the columns a stream actually provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    timestamp_index: usize,
    /// `(declared name, header index)` in declared order
    columns: Vec<(String, usize)>,
}

impl ResolvedColumns {
    /// Match a header row against a descriptor by exact (trimmed) name.
    pub fn resolve(
        descriptor: &StreamDescriptor,
        header: &StringRecord,
        source_name: &str,
        strict: bool,
    ) -> Result<Self, MergeError> {
        let position = |name: &str| header.iter().position(|h| h.trim() == name);

        let timestamp_index = position(&descriptor.timestamp_column).ok_or_else(|| {
            MergeError::MissingTimestampColumn {
                stream: descriptor.name.to_string(),
                source_name: source_name.to_string(),
                column: descriptor.timestamp_column.clone(),
            }
        })?;

        let mut columns: Vec<(String, usize)> = Vec::with_capacity(descriptor.columns.len());
        for name in &descriptor.columns {
            if columns.iter().any(|(taken, _)| taken == name) {
                continue;
            }
            match position(name) {
                Some(index) => columns.push((name.clone(), index)),
                None if strict => {
                    return Err(MergeError::MissingDataColumn {
                        stream: descriptor.name.to_string(),
                        column: name.clone(),
                    })
                }
                None => {
                    warn!(
                        stream = %descriptor.name,
                        source = source_name,
                        column = %name,
                        "declared column missing from header, dropping it"
                    );
                }
            }
        }

        Ok(Self {
            timestamp_index,
            columns,
        })
    }

    #[inline]
    pub fn timestamp_index(&self) -> usize {
        self.timestamp_index
    }

    /// Resolved names in output order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Minimum number of fields a row needs to supply every resolved column
    pub fn required_width(&self) -> usize {
        self.columns
            .iter()
            .map(|(_, index)| *index)
            .chain(std::iter::once(self.timestamp_index))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Cursor over one input file
pub struct StreamCursor<R: Read = File> {
    descriptor: Arc<StreamDescriptor>,
    source_name: String,
    reader: csv::Reader<NewlineIndex<R>>,
    record: StringRecord,
    resolved: ResolvedColumns,
    column_names: Vec<String>,
    alignment: Frequency,
    current: Option<Sample>,
    line_number: u64,
    lines_consumed: u64,
    rows_skipped: u64,
    total_lines: Option<u64>,
    exhausted: bool,
}

impl<R: Read> StreamCursor<R> {
    /// Open a cursor over any reader and position it on the first aligned sample.
    pub fn open(
        reader: R,
        descriptor: Arc<StreamDescriptor>,
        options: &CursorOptions,
    ) -> Result<Self, MergeError> {
        Self::open_named(reader, descriptor, options, "<reader>".to_string(), None)
    }

    fn open_named(
        reader: R,
        descriptor: Arc<StreamDescriptor>,
        options: &CursorOptions,
        source_name: String,
        total_lines: Option<u64>,
    ) -> Result<Self, MergeError> {
        let mut reader = line_tracking_reader(reader);

        let header = reader
            .headers()
            .map_err(|e| MergeError::csv(descriptor.name.as_str(), e.to_string()))?
            .clone();
        let resolved =
            ResolvedColumns::resolve(&descriptor, &header, &source_name, options.strict_columns)?;
        let column_names = resolved.names();
        let alignment = descriptor.alignment_frequency(options.target);

        let mut cursor = Self {
            descriptor,
            source_name,
            reader,
            record: StringRecord::new(),
            resolved,
            column_names,
            alignment,
            current: None,
            line_number: 1,
            lines_consumed: 1,
            rows_skipped: 0,
            total_lines,
            exhausted: false,
        };
        cursor.advance_to_aligned()?;
        Ok(cursor)
    }

    pub fn resolved(&self) -> &ResolvedColumns {
        &self.resolved
    }

    /// Grid this cursor snaps to
    pub fn alignment(&self) -> Frequency {
        self.alignment
    }

    /// Rows consumed without producing a sample
    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    fn stream(&self) -> String {
        self.descriptor.name.to_string()
    }

    fn advance_to_aligned(&mut self) -> Result<(), MergeError> {
        if self.exhausted {
            return Ok(());
        }
        let previous = self.current.as_ref().map(|s| s.timestamp);

        loop {
            let more = self
                .reader
                .read_record(&mut self.record)
                .map_err(|e| MergeError::csv(self.stream(), e.to_string()))?;
            if !more {
                self.finish();
                return Ok(());
            }
            self.lines_consumed += 1;
            let line = record_start_line(&mut self.reader, &self.record);

            let timestamp = self.row_timestamp(line)?;
            if timestamp.quantize(self.alignment) != timestamp {
                self.rows_skipped += 1;
                continue;
            }
            if previous.is_some_and(|p| timestamp < p) {
                return Err(MergeError::OutOfOrder {
                    stream: self.stream(),
                    line,
                });
            }

            let expected = self.resolved.required_width();
            if self.record.len() < expected {
                return Err(MergeError::ColumnWidthMismatch {
                    stream: self.stream(),
                    line,
                    expected,
                    found: self.record.len(),
                });
            }

            let values = self
                .resolved
                .columns
                .iter()
                .map(|(_, index)| self.record[*index].to_string())
                .collect();
            self.current = Some(Sample { timestamp, values });
            self.line_number = line;
            return Ok(());
        }
    }

    fn row_timestamp(&self, line: u64) -> Result<Timestamp, MergeError> {
        let index = self.resolved.timestamp_index;
        let raw = self
            .record
            .get(index)
            .ok_or_else(|| MergeError::ColumnWidthMismatch {
                stream: self.stream(),
                line,
                expected: index + 1,
                found: self.record.len(),
            })?;
        parse_timestamp(raw).ok_or_else(|| MergeError::TimestampParse {
            stream: self.stream(),
            line,
            value: raw.to_string(),
        })
    }

    fn finish(&mut self) {
        self.current = None;
        self.exhausted = true;
        metrics::counter!(
            "physio_merge_lines_read_total",
            "stream" => self.descriptor.name.to_string()
        )
        .increment(self.lines_consumed);
        metrics::counter!(
            "physio_merge_rows_skipped_total",
            "stream" => self.descriptor.name.to_string()
        )
        .increment(self.rows_skipped);
        debug!(
            stream = %self.descriptor.name,
            source = %self.source_name,
            lines = self.lines_consumed,
            skipped = self.rows_skipped,
            "stream exhausted"
        );
    }
}

impl StreamCursor<File> {
    /// Open a file, counting its lines first for progress reporting.
    #[instrument(
        name = "cursor_open",
        skip(descriptor, options),
        fields(stream = %descriptor.name, path = %path.display())
    )]
    pub fn open_path(
        path: &Path,
        descriptor: Arc<StreamDescriptor>,
        options: &CursorOptions,
    ) -> Result<Self, MergeError> {
        let total_lines = count_lines(path)?;
        let file = File::open(path)?;
        let cursor = Self::open_named(
            file,
            descriptor,
            options,
            path.display().to_string(),
            Some(total_lines),
        )?;
        debug!(
            total_lines,
            columns = ?cursor.column_names,
            alignment = %cursor.alignment,
            "cursor opened"
        );
        Ok(cursor)
    }
}

impl<R: Read + Send> AlignedSource for StreamCursor<R> {
    fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    fn columns(&self) -> &[String] {
        &self.column_names
    }

    fn current(&self) -> Option<&Sample> {
        self.current.as_ref()
    }

    fn line_number(&self) -> u64 {
        self.line_number
    }

    fn advance(&mut self) -> Result<(), MergeError> {
        self.advance_to_aligned()
    }

    fn lines_consumed(&self) -> u64 {
        self.lines_consumed
    }

    fn total_lines(&self) -> Option<u64> {
        self.total_lines
    }
}

/// Count newline-terminated lines, plus a trailing unterminated one
pub fn count_lines(path: &Path) -> io::Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::with_capacity(256);
    let mut count = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(count);
        }
        count += 1;
    }
}
