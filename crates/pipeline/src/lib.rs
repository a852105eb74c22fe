//! Render-job execution pipeline.
//!
//! [`RenderPipeline::submit`](orchestrator::RenderPipeline::submit) takes
//! script source and drives one job through workspace allocation, script
//! materialization, tool execution, artifact location and publication,
//! returning a public URL or a typed [`RenderError`](error::RenderError).

pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod publisher;

pub use config::PipelineSettings;
pub use error::RenderError;
pub use orchestrator::{RenderPipeline, RenderRequest, RenderSuccess};
