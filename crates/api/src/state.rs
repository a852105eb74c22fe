use std::sync::Arc;

use scenecast_pipeline::RenderPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Render pipeline shared by every request.
    pub pipeline: Arc<RenderPipeline>,
}
