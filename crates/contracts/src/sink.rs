//! RowSink trait - Merge engine output interface

use crate::{MergeError, MergeLayout, MergeRow};

/// Destination for merged rows
///
/// The engine calls `begin` once, `write` per accepted row, then `finish`.
pub trait RowSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Receive the column layout and emit headers
    fn begin(&mut self, layout: &MergeLayout) -> Result<(), MergeError>;

    /// Write one merged row
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn write(&mut self, row: &MergeRow) -> Result<(), MergeError>;

    /// Flush and close; returns rows written
    fn finish(&mut self) -> Result<u64, MergeError>;
}
