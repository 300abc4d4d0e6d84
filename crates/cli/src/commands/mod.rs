//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::MergeConfig;

use crate::error::CliError;

pub use info::run_info;
pub use run::run_merge;
pub use validate::run_validate;

/// Load `path`, or fall back to the built-in defaults when none is given
pub(crate) fn load_config(path: Option<&Path>) -> Result<MergeConfig> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
