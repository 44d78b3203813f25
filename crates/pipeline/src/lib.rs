//! Orchestration steps of the labeling chain.
//!
//! Each step takes a [`PipelineContext`](context::PipelineContext) built
//! once per invocation and runs to completion:
//!
//! - [`trigger`]: classify an inbound event and start a pipeline execution.
//! - [`preprocess`]: crop drop-bucket images into the job-input bucket.
//! - [`chain`]: resolve the job chain and submit the next labeling job.

pub mod chain;
pub mod context;
pub mod error;
pub mod manifest;
pub mod preprocess;
pub mod trigger;
