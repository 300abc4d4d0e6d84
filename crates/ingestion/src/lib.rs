//! # Ingestion
//!
//! Raw recording input.
//!
//! Responsibilities:
//! - Discover per-participant recordings by stream token
//! - Presort recordings chronologically
//! - Read each recording as a cursor of aligned samples (`StreamCursor`)
//!
//! ## Usage Example
//!
//! ```no_run
//! use contracts::{AlignedSource, Frequency, StreamCatalog};
//! use ingestion::{discover, CursorOptions, StreamCursor};
//! use std::path::Path;
//!
//! let catalog = StreamCatalog::default();
//! let options = CursorOptions::new(Frequency::new(4).unwrap());
//! for (participant, files) in discover(Path::new("raw"), &catalog).unwrap() {
//!     for file in files {
//!         let cursor = StreamCursor::open_path(&file.path, file.descriptor, &options).unwrap();
//!         println!("{participant}: first sample {:?}", cursor.current());
//!     }
//! }
//! ```

mod cursor;
mod discovery;
mod lines;
mod presort;

pub use cursor::{count_lines, CursorOptions, ResolvedColumns, StreamCursor};
pub use discovery::{classify, discover, DiscoveredFile, ParticipantFiles};
pub use presort::{sort_file, SortOutcome};
