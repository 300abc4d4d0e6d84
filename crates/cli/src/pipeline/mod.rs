//! Batch orchestration module.

mod job;
mod orchestrator;
mod stats;

pub use orchestrator::Orchestrator;
pub use stats::PipelineStats;
