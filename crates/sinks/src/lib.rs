//! # Sinks
//!
//! Destinations for merged rows.
//!
//! - `CsvSink`: the MERGED and DEBUG tables of one participant
//! - `LogSink`: counts and traces rows without writing anything (dry runs)
//! - `MemorySink`: keeps rows in memory (tests)

mod csv_sink;
mod log;
mod memory;

pub use contracts::{MergeLayout, MergeRow, RowSink};
pub use csv_sink::{debug_path, merged_path, CsvSink};
pub use log::LogSink;
pub use memory::MemorySink;
