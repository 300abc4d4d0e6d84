//! Layered error definitions
//!
//! Categorized by source: config / stream structure / merge / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum MergeError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Structure Errors =====
    /// The timestamp column is absent from a stream's header
    #[error("stream '{stream}' ({source_name}) has no timestamp column '{column}'")]
    MissingTimestampColumn {
        stream: String,
        source_name: String,
        column: String,
    },

    /// A declared data column is absent (strict mode only)
    #[error("stream '{stream}' is missing declared column '{column}'")]
    MissingDataColumn { stream: String, column: String },

    /// A data row is too short for the resolved columns
    #[error("stream '{stream}' line {line}: expected at least {expected} fields, found {found}")]
    ColumnWidthMismatch {
        stream: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Timestamp field could not be parsed
    #[error("stream '{stream}' line {line}: unparseable timestamp '{value}'")]
    TimestampParse {
        stream: String,
        line: u64,
        value: String,
    },

    /// An aligned sample went backwards in time
    #[error("stream '{stream}' line {line}: timestamp earlier than previous sample (input not sorted?)")]
    OutOfOrder { stream: String, line: u64 },

    /// Underlying CSV reader/writer failure
    #[error("csv error in '{stream}': {message}")]
    Csv { stream: String, message: String },

    // ===== Merge Errors =====
    /// Merge requested with no input streams
    #[error("no input streams to merge")]
    NoStreams,

    /// Two inputs of the same stream type for one participant
    #[error("stream '{stream}' supplied more than once")]
    DuplicateStream { stream: String },

    /// A stream had no aligned sample before the merge started
    #[error("stream '{stream}' has no aligned samples")]
    StreamExhaustedEarly { stream: String },

    /// Per-participant deadline elapsed
    #[error("merge deadline exceeded after {elapsed_ms}ms ({rows_written} rows written)")]
    DeadlineExceeded { elapsed_ms: u64, rows_written: u64 },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl MergeError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create CSV error
    pub fn csv(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Csv {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error comes from a stream's structure or content
    /// (as opposed to config, sink or I/O failures)
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTimestampColumn { .. }
                | Self::MissingDataColumn { .. }
                | Self::ColumnWidthMismatch { .. }
                | Self::TimestampParse { .. }
                | Self::OutOfOrder { .. }
                | Self::Csv { .. }
                | Self::StreamExhaustedEarly { .. }
        )
    }
}

/// Result alias used across the workspace
pub type Result<T> = std::result::Result<T, MergeError>;
