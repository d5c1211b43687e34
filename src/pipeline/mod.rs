//! YAML-configurable pipelines of transforms.

pub mod runner;

pub use runner::{example_config, Pipeline, PipelineConfig, PipelineOutput, PipelineStep};
