//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration failed cross-field validation
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Some participants could not be merged
    #[error("{failed} of {total} participant(s) failed")]
    ParticipantsFailed { failed: u64, total: u64 },

    /// Stopped by Ctrl-C or SIGTERM
    #[error("Interrupted before all participants finished")]
    Interrupted,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}
