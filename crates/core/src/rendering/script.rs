//! Script materialization.

use std::path::PathBuf;

use super::workspace::Workspace;
use crate::error::CoreError;

/// File name the rendering tool is pointed at inside every workspace.
pub const SCRIPT_FILE_NAME: &str = "scene.py";

/// Write `source` verbatim to [`SCRIPT_FILE_NAME`] inside the workspace.
///
/// The source is opaque text: it is neither parsed nor size-checked here.
pub async fn write_script(workspace: &Workspace, source: &str) -> Result<PathBuf, CoreError> {
    let path = workspace.path().join(SCRIPT_FILE_NAME);
    tokio::fs::write(&path, source).await.map_err(|e| {
        CoreError::Internal(format!("failed to write render script: {e}"))
    })?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
