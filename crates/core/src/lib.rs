//! Pure render-job building blocks: workspaces, script materialization,
//! bounded tool execution and artifact discovery.
//!
//! Nothing in this crate talks to object storage or HTTP; those layers
//! live in `scenecast-cloud`, `scenecast-pipeline` and `scenecast-api`.

pub mod error;
pub mod rendering;
pub mod types;
