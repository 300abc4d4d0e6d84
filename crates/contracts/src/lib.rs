//! # Contracts
//!
//! Shared data model of the merge pipeline: stream catalog, time model,
//! configuration, errors and the source/sink traits. Every other crate depends
//! on this one; it depends on none of them.
//!
//! ## Time Model
//! - Instants are integer microseconds since the Unix epoch (UTC)
//! - Grid snapping is exact integer arithmetic (see [`Timestamp::quantize`])

mod config;
mod descriptor;
mod error;
mod merge;
mod sink;
mod source;
mod stream_name;
mod time;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use merge::*;
pub use sink::RowSink;
pub use source::AlignedSource;
pub use stream_name::StreamName;
pub use time::*;
