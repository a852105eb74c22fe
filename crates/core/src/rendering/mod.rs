//! Render-job stages that run on the local machine.
//!
//! Each stage is a small, independently testable unit; sequencing them
//! into a job (and publishing the result) is the pipeline crate's job.

pub mod artifact;
pub mod executor;
pub mod quality;
pub mod script;
pub mod subprocess;
pub mod workspace;
