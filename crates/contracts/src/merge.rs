//! Merge data model: samples in, rows and reports out.

use serde::Serialize;

use crate::{StreamCatalog, StreamName, Timestamp};

/// One parsed, aligned row of an input stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Row timestamp
    pub timestamp: Timestamp,
    /// Raw field text of the resolved data columns
    pub values: Vec<String>,
}

/// Column layout handed to sinks before the first row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeLayout {
    /// Resolved data column names of the participating streams, in `merge_order`
    pub data_columns: Vec<String>,
    /// `"<name> line #"` per catalog entry, in `merge_order`
    pub provenance_columns: Vec<String>,
}

impl MergeLayout {
    /// Leading columns of both tables
    pub const LEAD_COLUMNS: [&'static str; 2] = ["timer", "timestamp"];

    /// Provenance columns for every catalog entry
    pub fn provenance_for(catalog: &StreamCatalog) -> Vec<String> {
        catalog.iter().map(|d| d.name.line_column()).collect()
    }

    /// Number of data values a complete row carries
    pub fn width(&self) -> usize {
        self.data_columns.len()
    }

    /// MERGED table header
    pub fn merged_header(&self) -> Vec<String> {
        Self::LEAD_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.data_columns.iter().cloned())
            .collect()
    }

    /// DEBUG table header
    pub fn debug_header(&self) -> Vec<String> {
        let mut header = self.merged_header();
        header.extend(self.provenance_columns.iter().cloned());
        header
    }
}

/// One synchronized output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRow {
    /// Elapsed time within the current contiguous run (microseconds)
    pub timer_offset: i64,
    /// The synchronized instant
    pub timestamp: Timestamp,
    /// Values of every active stream, in `merge_order`
    pub values: Vec<String>,
    /// Source line per catalog entry; `None` for stream types not present
    pub provenance: Vec<Option<u64>>,
}

/// Lines consumed from one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamUsage {
    pub stream: StreamName,
    pub lines_consumed: u64,
}

/// Outcome of one participant's merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Rows written to both tables
    pub rows_written: u64,
    /// Distinct instants examined
    pub instants_visited: u64,
    /// Instants dropped because a stream had no concurrent sample
    pub rows_dropped_misaligned: u64,
    /// Instants dropped because the assembled width did not match the header
    pub rows_dropped_width: u64,
    /// First stream that ran dry while others still had data
    pub stopped_by: Option<StreamName>,
    /// Per-input consumption, in `merge_order`
    pub streams: Vec<StreamUsage>,
}

impl MergeReport {
    /// Total instants dropped for any reason
    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped_misaligned + self.rows_dropped_width
    }

    /// Fraction of visited instants that were written
    pub fn acceptance_ratio(&self) -> f64 {
        if self.instants_visited == 0 {
            0.0
        } else {
            self.rows_written as f64 / self.instants_visited as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_headers() {
        let catalog = StreamCatalog::default();
        let layout = MergeLayout {
            data_columns: vec!["HR".into(), "TEMP".into()],
            provenance_columns: MergeLayout::provenance_for(&catalog),
        };
        assert_eq!(layout.merged_header(), ["timer", "timestamp", "HR", "TEMP"]);
        let debug = layout.debug_header();
        assert_eq!(debug.len(), 4 + 5);
        assert_eq!(debug[4], "HR line #");
        assert_eq!(debug[8], "EDA line #");
    }

    #[test]
    fn test_acceptance_ratio() {
        let report = MergeReport {
            rows_written: 3,
            instants_visited: 4,
            rows_dropped_misaligned: 1,
            ..Default::default()
        };
        assert!((report.acceptance_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.rows_dropped(), 1);
        assert_eq!(MergeReport::default().acceptance_ratio(), 0.0);
    }
}
