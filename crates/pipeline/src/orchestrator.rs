//! Render pipeline orchestrator.
//!
//! Drives one job through its stages and owns the job's workspace for the
//! whole run. Held in the API's `AppState` as an `Arc<RenderPipeline>`.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::Instrument;

use scenecast_cloud::ObjectStore;
use scenecast_core::rendering::artifact::{self, ArtifactPolicy, LocateError};
use scenecast_core::rendering::executor::{
    ExecutionFailure, FailureKind, RenderOutcome, ToolExecutor,
};
use scenecast_core::rendering::quality::RenderQuality;
use scenecast_core::rendering::script::write_script;
use scenecast_core::rendering::subprocess::CapturedOutput;
use scenecast_core::rendering::workspace::{Workspace, WorkspaceManager};
use scenecast_core::types::JobId;

use crate::config::PipelineSettings;
use crate::error::RenderError;
use crate::job::{Job, JobStatus};
use crate::publisher::Publisher;

/// Placeholder substituted for the workspace path in captured logs.
const WORKSPACE_PLACEHOLDER: &str = "<workspace>";

/// A render submission.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: String,
    /// Overrides the pipeline's default quality.
    pub quality: Option<RenderQuality>,
}

impl RenderRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: RenderQuality) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// A published render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderSuccess {
    pub job_id: JobId,
    pub video_url: String,
    pub key: String,
    /// Wall-clock time spent in the rendering tool.
    pub render_ms: u64,
}

/// Runs render jobs: allocate workspace, write script, run the tool,
/// locate the video, publish it, release the workspace.
///
/// Jobs are independent; the only shared mutable state is the optional
/// concurrency limit.
pub struct RenderPipeline {
    store: Option<Arc<dyn ObjectStore>>,
    workspaces: WorkspaceManager,
    executor: ToolExecutor,
    default_quality: RenderQuality,
    artifact_policy: ArtifactPolicy,
    slots: Option<Semaphore>,
}

impl RenderPipeline {
    /// `store` is `None` when no bucket is configured; every submission
    /// then fails with [`RenderError::ConfigurationMissing`].
    pub fn new(settings: PipelineSettings, store: Option<Arc<dyn ObjectStore>>) -> Self {
        let slots = match settings.max_concurrent_jobs {
            0 => None,
            n => Some(Semaphore::new(n)),
        };
        Self {
            store,
            workspaces: WorkspaceManager::new(settings.workspace_root),
            executor: ToolExecutor::new(&settings.tool, settings.timeout),
            default_quality: settings.default_quality,
            artifact_policy: settings.artifact_policy,
            slots,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn ensure_configured(&self) -> Result<&Arc<dyn ObjectStore>, RenderError> {
        self.store.as_ref().ok_or_else(|| {
            RenderError::ConfigurationMissing("storage bucket is not configured".to_string())
        })
    }

    pub fn default_quality(&self) -> RenderQuality {
        self.default_quality
    }

    pub fn workspace_root(&self) -> &Path {
        self.workspaces.root()
    }

    /// Render `source` at the default quality.
    pub async fn submit(&self, source: &str) -> Result<RenderSuccess, RenderError> {
        self.submit_request(RenderRequest::new(source)).await
    }

    /// Run one job to a terminal status.
    ///
    /// Dropping the returned future kills the tool's process group and
    /// removes the workspace.
    pub async fn submit_request(
        &self,
        request: RenderRequest,
    ) -> Result<RenderSuccess, RenderError> {
        let quality = request.quality.unwrap_or(self.default_quality);
        let mut job = Job::new(request.source, quality);
        let span = tracing::info_span!("render_job", job_id = %job.id);

        async move {
            tracing::info!(%quality, source_bytes = job.source.len(), "Render job submitted");

            let result = self.drive(&mut job).await;

            let terminal = match result {
                Ok(_) => JobStatus::Succeeded,
                Err(_) => JobStatus::Failed,
            };
            if let Err(e) = job.transition(terminal) {
                tracing::error!(error = %e, "Job status machine violated");
            }

            match &result {
                Ok(success) => tracing::info!(
                    key = %success.key,
                    url = %success.video_url,
                    elapsed_ms = job.elapsed_ms(),
                    "Render job succeeded"
                ),
                Err(e) if e.is_client_error() => {
                    tracing::info!(code = e.code(), error = %e, "Render job rejected")
                }
                Err(e) => tracing::warn!(
                    code = e.code(),
                    error = %e,
                    elapsed_ms = job.elapsed_ms(),
                    "Render job failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Steps up to, but not including, the terminal status.
    ///
    /// 1. Reject unconfigured storage and empty sources (no workspace).
    /// 2. Wait for a slot; the job stays pending meanwhile.
    /// 3. Mark running and allocate the workspace.
    /// 4. Render and publish.
    /// 5. Release the workspace on every branch.
    async fn drive(&self, job: &mut Job) -> Result<RenderSuccess, RenderError> {
        let store = self.ensure_configured()?;
        if job.source.trim().is_empty() {
            return Err(RenderError::InvalidRequest(
                "script source is empty".to_string(),
            ));
        }

        let _slot = self.acquire_slot().await?;
        job.transition(JobStatus::Running)?;

        let workspace = self.workspaces.allocate(&job.id).await?;
        let result = self.render_in(job, &workspace, store.as_ref()).await;

        if let Err(e) = workspace.release().await {
            tracing::warn!(error = %e, "Failed to remove job workspace");
        }

        result
    }

    async fn acquire_slot(&self) -> Result<Option<SemaphorePermit<'_>>, RenderError> {
        match &self.slots {
            Some(slots) => slots
                .acquire()
                .await
                .map(Some)
                .map_err(|_| RenderError::Internal("render slots closed".to_string())),
            None => Ok(None),
        }
    }

    async fn render_in(
        &self,
        job: &Job,
        workspace: &Workspace,
        store: &dyn ObjectStore,
    ) -> Result<RenderSuccess, RenderError> {
        let script_path = write_script(workspace, &job.source).await?;

        let outcome = self
            .executor
            .run(&script_path, workspace, job.quality)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Rendering tool could not be started");
                RenderError::Internal(e.to_string())
            })?;

        let (output, render_ms) = match outcome {
            RenderOutcome::Success {
                output,
                duration_ms,
            } => (output, duration_ms),
            RenderOutcome::Failure(failure) => {
                return Err(self.execution_error(failure, workspace.path()));
            }
        };

        let output_dir = artifact::expected_output_dir(workspace.path(), &script_path, job.quality);
        let located = artifact::locate(&output_dir, self.artifact_policy, &job.id)
            .await
            .map_err(|e| match e {
                LocateError::NotFound => RenderError::ArtifactNotFound {
                    logs: diagnostic_logs(&output, workspace.path()),
                },
                LocateError::Ambiguous { candidates } => {
                    RenderError::ArtifactAmbiguous { candidates }
                }
                LocateError::Io(e) => {
                    RenderError::Internal(format!("failed to scan render output: {e}"))
                }
            })?;

        let published = Publisher::new(store).publish(&located).await?;

        Ok(RenderSuccess {
            job_id: job.id,
            video_url: published.url,
            key: published.key,
            render_ms,
        })
    }

    fn execution_error(&self, failure: ExecutionFailure, workspace: &Path) -> RenderError {
        let logs = diagnostic_logs(&failure.output, workspace);
        match failure.kind {
            FailureKind::TimedOut => RenderError::ExecutionTimedOut {
                timeout_secs: self.executor.timeout().as_secs(),
                logs,
            },
            FailureKind::Exited => RenderError::ExecutionFailed {
                exit_code: failure.exit_code,
                logs,
            },
        }
    }
}

/// Tool diagnostics for the caller: stderr exactly as captured, with the
/// workspace path replaced.
fn diagnostic_logs(output: &CapturedOutput, workspace: &Path) -> String {
    redact(&output.stderr, workspace)
}

fn redact(text: &str, workspace: &Path) -> String {
    let path = workspace.to_string_lossy();
    if path.is_empty() {
        return text.to_string();
    }
    text.replace(path.as_ref(), WORKSPACE_PLACEHOLDER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
