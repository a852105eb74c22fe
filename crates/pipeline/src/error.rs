use scenecast_core::error::CoreError;

use crate::publisher::{PublishError, PublishStage};

/// Terminal failure of a render job. Exactly one kind per failed job.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Storage is not configured; nothing was allocated.
    #[error("Server is not configured: {0}")]
    ConfigurationMissing(String),

    /// The request itself is unusable; nothing was allocated.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The tool exited non-zero or died from a signal.
    #[error("Rendering failed{}", exit_suffix(.exit_code))]
    ExecutionFailed {
        exit_code: Option<i32>,
        logs: String,
    },

    /// The tool exceeded its time limit and was killed.
    #[error("Rendering timed out after {timeout_secs}s")]
    ExecutionTimedOut { timeout_secs: u64, logs: String },

    /// The tool exited zero but wrote no video.
    #[error("Rendering finished but produced no video file")]
    ArtifactNotFound { logs: String },

    /// Several videos and the policy forbids picking one.
    #[error("Rendering produced {} video files; expected exactly one", .candidates.len())]
    ArtifactAmbiguous { candidates: Vec<String> },

    /// Upload, visibility change, or URL issue failed.
    #[error("Publishing the video failed at the {stage} step: {reason}")]
    PublishFailed { stage: PublishStage, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_string(),
    }
}

impl RenderError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ExecutionFailed { .. } => "EXECUTION_FAILED",
            Self::ExecutionTimedOut { .. } => "EXECUTION_TIMED_OUT",
            Self::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
            Self::ArtifactAmbiguous { .. } => "ARTIFACT_AMBIGUOUS",
            Self::PublishFailed { .. } => "PUBLISH_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Captured tool output, when the failure has any.
    pub fn logs(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { logs, .. }
            | Self::ExecutionTimedOut { logs, .. }
            | Self::ArtifactNotFound { logs } => Some(logs.as_str()),
            _ => None,
        }
    }

    /// Whether the caller sent something unusable, as opposed to a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

impl From<PublishError> for RenderError {
    fn from(err: PublishError) -> Self {
        Self::PublishFailed {
            stage: err.stage,
            reason: err.reason,
        }
    }
}

impl From<CoreError> for RenderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => Self::InvalidRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_failure_message_names_exit_code() {
        let err = RenderError::ExecutionFailed {
            exit_code: Some(1),
            logs: "SyntaxError: invalid syntax".into(),
        };
        assert_eq!(err.to_string(), "Rendering failed with exit code 1");
        assert_eq!(err.logs(), Some("SyntaxError: invalid syntax"));
        assert_eq!(err.code(), "EXECUTION_FAILED");
    }

    #[test]
    fn signal_death_has_no_exit_code() {
        let err = RenderError::ExecutionFailed {
            exit_code: None,
            logs: String::new(),
        };
        assert_eq!(err.to_string(), "Rendering failed (terminated by signal)");
    }

    #[test]
    fn publish_failure_keeps_stage() {
        let err: RenderError = PublishError {
            stage: PublishStage::Visibility,
            reason: "AccessDenied".into(),
        }
        .into();
        assert_eq!(err.code(), "PUBLISH_FAILED");
        assert!(err.to_string().contains("visibility"));
        assert_eq!(err.logs(), None);
    }

    #[test]
    fn only_invalid_request_is_a_client_error() {
        assert!(RenderError::InvalidRequest("empty".into()).is_client_error());
        assert!(!RenderError::ConfigurationMissing("bucket".into()).is_client_error());
        assert!(!RenderError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn core_validation_maps_to_invalid_request() {
        let err: RenderError = CoreError::Validation("unknown quality".into()).into();
        assert_eq!(err.code(), "INVALID_REQUEST");
        let err: RenderError = CoreError::Conflict("exists".into()).into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
