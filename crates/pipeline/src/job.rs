//! Render job record and its status machine.

use serde::Serialize;

use scenecast_core::error::CoreError;
use scenecast_core::rendering::quality::RenderQuality;
use scenecast_core::types::{JobId, Timestamp};

/// Lifecycle status of a render job.
///
/// `Pending -> Running -> Succeeded | Failed`, plus `Pending -> Failed`
/// for requests rejected before any resource is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }
}

/// One render request, from submission to terminal status.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub source: String,
    pub quality: RenderQuality,
    pub status: JobStatus,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Job {
    pub fn new(source: String, quality: RenderQuality) -> Self {
        Self {
            id: JobId::new(),
            source,
            quality,
            status: JobStatus::Pending,
            created_at: chrono::Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `next`, stamping `finished_at` on terminal statuses.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::Conflict(format!(
                "job {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        tracing::debug!(from = ?self.status, to = ?next, "Job status changed");
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    /// Milliseconds between creation and the terminal status.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.created_at).num_milliseconds())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
