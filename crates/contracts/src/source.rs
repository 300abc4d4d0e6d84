//! AlignedSource trait - Merge engine input interface
//!
//! A source yields one stream's samples already snapped to that stream's
//! alignment grid, in non-decreasing timestamp order.

use crate::{MergeError, Sample, StreamDescriptor};

/// Forward-only cursor over one stream's aligned samples
///
/// Implementations are positioned on their first aligned sample when handed to
/// the engine; `current()` returning `None` means the stream is exhausted.
pub trait AlignedSource: Send {
    /// Descriptor of the stream this source reads
    fn descriptor(&self) -> &StreamDescriptor;

    /// Resolved data column names (declared columns present in the input)
    fn columns(&self) -> &[String];

    /// Sample under the cursor, if any
    fn current(&self) -> Option<&Sample>;

    /// 1-based line of the current sample in the underlying file
    fn line_number(&self) -> u64;

    /// Move to the next aligned sample
    ///
    /// # Errors
    /// Returns the stream error that stopped the read (bad timestamp, short
    /// row, out-of-order sample, I/O).
    fn advance(&mut self) -> Result<(), MergeError>;

    /// Lines consumed so far, header included
    fn lines_consumed(&self) -> u64;

    /// Total lines of the input, if known up front
    fn total_lines(&self) -> Option<u64> {
        None
    }
}
