//! Pipeline composition and execution for spike correction.

mod runner;

pub use runner::{Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
