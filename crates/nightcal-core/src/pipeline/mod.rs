pub mod config;
mod orchestrator;
mod types;

pub use config::{OutputConfig, PipelineConfig};
pub use orchestrator::{output_path, run_pipeline, run_pipeline_reported};
pub use types::{NoOpReporter, PipelineOutput, PipelineStage, ProgressReporter};
