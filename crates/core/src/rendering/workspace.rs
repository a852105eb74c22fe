//! Per-job filesystem isolation.
//!
//! [`WorkspaceManager::allocate`] hands out a [`Workspace`] guard owning
//! `<root>/<job_id>`. The directory is removed exactly once: either by an
//! explicit [`Workspace::release`] or, on any path that never reached it
//! (early return, panic, a dropped request future), by the guard's `Drop`.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::types::JobId;

/// Allocates job workspaces under a fixed root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// A relative `root` is anchored at the current directory, because the
    /// rendering tool runs with the workspace as its working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = match std::env::current_dir() {
            Ok(cwd) if root.is_relative() => cwd.join(root),
            _ => root,
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a workspace for `job_id` would occupy. Does not touch the disk.
    pub fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    /// Create a fresh, empty directory exclusively owned by `job_id`.
    ///
    /// Fails with [`CoreError::Conflict`] if the directory already exists;
    /// a job identity is never reused, so this only happens on misuse.
    pub async fn allocate(&self, job_id: &JobId) -> Result<Workspace, CoreError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.path_for(job_id);
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(CoreError::Conflict(format!(
                    "workspace for job {job_id} already exists"
                )));
            }
            Err(e) => return Err(CoreError::Io(e)),
        }

        tracing::debug!(%job_id, path = %path.display(), "Workspace allocated");

        Ok(Workspace {
            job_id: *job_id,
            path,
            released: false,
        })
    }
}

/// Exclusive handle to one job's scratch directory.
#[derive(Debug)]
pub struct Workspace {
    job_id: JobId,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively remove the workspace.
    ///
    /// Consumes the guard so a second release cannot be expressed. A
    /// directory that is already gone counts as released.
    pub async fn release(mut self) -> io::Result<()> {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                tracing::debug!(job_id = %self.job_id, "Workspace released");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let job_id = self.job_id;
        let path = std::mem::take(&mut self.path);
        let remove = move || match std::fs::remove_dir_all(&path) {
            Ok(()) => tracing::debug!(%job_id, "Workspace released on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                %job_id,
                error = %e,
                "Failed to remove workspace on drop"
            ),
        };

        // Avoid blocking a runtime worker thread when dropped inside async code.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
