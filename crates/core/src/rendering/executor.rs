//! Render executor: runs the external rendering tool against a
//! materialized script and classifies how it ended.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::quality::RenderQuality;
use super::subprocess::{self, CapturedOutput, ExitState};
use super::workspace::Workspace;

/// Default wall-clock budget for one render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(1700);

/// Default rendering tool, resolved through `PATH`.
pub const DEFAULT_RENDER_TOOL: &str = "manim";

/// Why an execution did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The tool exited non-zero or was killed by a signal.
    Exited,
    /// The tool exceeded its timeout and was killed.
    TimedOut,
}

/// A failed execution, with whatever the tool printed before it ended.
#[derive(Debug, Clone)]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    /// `None` for timeouts and signal deaths.
    pub exit_code: Option<i32>,
    pub output: CapturedOutput,
    pub duration_ms: u64,
}

/// Outcome of one tool invocation. Exactly one of the two holds.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Zero exit. The artifact still has to be located.
    Success {
        output: CapturedOutput,
        duration_ms: u64,
    },
    Failure(ExecutionFailure),
}

/// Errors that prevent the tool from running at all.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("rendering tool '{program}' could not be started: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Invokes the rendering tool as `<program> <quality-flag> <script>` with
/// the workspace as working directory.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    program: PathBuf,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: resolve_program(program),
            timeout,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the tool once. Never retried.
    pub async fn run(
        &self,
        script_path: &Path,
        workspace: &Workspace,
        quality: RenderQuality,
    ) -> Result<RenderOutcome, ExecutorError> {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.arg(quality.flag())
            .arg(script_path)
            .current_dir(workspace.path());

        tracing::info!(
            job_id = %workspace.job_id(),
            program = %self.program.display(),
            quality = %quality,
            timeout_secs = self.timeout.as_secs(),
            "Starting rendering tool"
        );

        let run = subprocess::run_bounded(cmd, self.timeout)
            .await
            .map_err(|source| ExecutorError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let outcome = match run.exit {
            state if state.is_success() => RenderOutcome::Success {
                output: run.output,
                duration_ms: run.duration_ms,
            },
            ExitState::Exited { code } => RenderOutcome::Failure(ExecutionFailure {
                kind: FailureKind::Exited,
                exit_code: code,
                output: run.output,
                duration_ms: run.duration_ms,
            }),
            ExitState::TimedOut => RenderOutcome::Failure(ExecutionFailure {
                kind: FailureKind::TimedOut,
                exit_code: None,
                output: run.output,
                duration_ms: run.duration_ms,
            }),
        };

        match &outcome {
            RenderOutcome::Success { duration_ms, .. } => tracing::info!(
                job_id = %workspace.job_id(),
                elapsed_ms = duration_ms,
                "Rendering tool finished"
            ),
            RenderOutcome::Failure(f) => tracing::warn!(
                job_id = %workspace.job_id(),
                kind = ?f.kind,
                exit_code = ?f.exit_code,
                elapsed_ms = f.duration_ms,
                "Rendering tool failed"
            ),
        }

        Ok(outcome)
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_TOOL, DEFAULT_RENDER_TIMEOUT)
    }
}

/// Resolve `program` against the working directory when it is a relative
/// path with separators, so changing into the workspace does not break it.
pub fn resolve_program(program: &str) -> PathBuf {
    let path = Path::new(program);
    if path.is_relative() && path.components().count() > 1 {
        if let Ok(cwd) = std::env::current_dir() {
            return cwd.join(path);
        }
    }
    path.to_path_buf()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
