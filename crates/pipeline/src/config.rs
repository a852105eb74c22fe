use std::path::PathBuf;
use std::time::Duration;

use scenecast_core::rendering::artifact::ArtifactPolicy;
use scenecast_core::rendering::executor::{DEFAULT_RENDER_TIMEOUT, DEFAULT_RENDER_TOOL};
use scenecast_core::rendering::quality::RenderQuality;

/// Default cap on concurrently running jobs; `0` means unbounded.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 0;

/// Process-wide pipeline settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory under which per-job workspaces are created.
    pub workspace_root: PathBuf,
    /// Rendering tool: a bare name looked up on `PATH`, or a path.
    pub tool: String,
    /// Quality used when a request does not choose one.
    pub default_quality: RenderQuality,
    pub timeout: Duration,
    pub artifact_policy: ArtifactPolicy,
    /// `0` disables the cap.
    pub max_concurrent_jobs: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("scenecast"),
            tool: DEFAULT_RENDER_TOOL.to_string(),
            default_quality: RenderQuality::default(),
            timeout: DEFAULT_RENDER_TIMEOUT,
            artifact_policy: ArtifactPolicy::default(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}
