//! # Sync Engine
//!
//! Multi-stream merge onto a uniform output grid.
//!
//! Responsibilities:
//! - Pick the earliest pending instant across a participant's streams
//! - Accept an instant only when every stream has a concurrent sample
//! - Keep the elapsed-time column and per-row provenance
//! - Hand accepted rows to a `RowSink`
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::{EngineConfig, MergeEngine};
//!
//! let engine = MergeEngine::new(catalog, sources, EngineConfig::default())?;
//! let report = engine.run(&mut sink)?;
//! println!("{} rows", report.rows_written);
//! ```

mod engine;
mod timer;

pub use engine::{EngineConfig, MergeEngine};
pub use timer::TimerOffset;

pub use contracts::{AlignmentMode, MergeReport, MergeRow};
