//! Artifact discovery.
//!
//! The rendering tool writes its video to
//! `<workspace>/media/videos/<script stem>/<profile>/<Scene>.mp4`. The
//! directory may also hold sub-directories (partial movie files) and, if
//! the script defines several scenes, several videos. Which one becomes
//! *the* artifact is decided by an explicit [`ArtifactPolicy`], never by
//! directory enumeration order.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use super::quality::RenderQuality;
use crate::error::CoreError;
use crate::types::JobId;

/// Extension of the media file the tool produces.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Storage key prefix under which every job's artifacts live.
pub const STORAGE_PREFIX: &str = "renders";

/// What to do when more than one candidate artifact exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactPolicy {
    /// Take the first candidate in byte-wise file-name order.
    #[default]
    FirstLexical,
    /// Fail with [`LocateError::Ambiguous`].
    Reject,
}

impl FromStr for ArtifactPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_lexical" => Ok(Self::FirstLexical),
            "reject" => Ok(Self::Reject),
            other => Err(CoreError::Validation(format!(
                "Unknown artifact policy '{other}'. Must be one of: first, reject"
            ))),
        }
    }
}

impl fmt::Display for ArtifactPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstLexical => f.write_str("first"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// A located output file, read-only input to publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    local_path: PathBuf,
    file_name: String,
    storage_key: String,
}

impl Artifact {
    pub fn new(job_id: &JobId, local_path: PathBuf, file_name: String) -> Self {
        let storage_key = storage_key(job_id, &file_name);
        Self {
            local_path,
            file_name,
            storage_key,
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `renders/<job_id>/<file_name>`.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

/// An artifact that has been uploaded and made publicly readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    pub key: String,
    pub url: String,
}

/// Why no single artifact could be chosen.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("the rendering tool produced no .mp4 file")]
    NotFound,

    #[error("the rendering tool produced {} candidate files", .candidates.len())]
    Ambiguous { candidates: Vec<String> },

    #[error("failed to scan output directory: {0}")]
    Io(#[from] std::io::Error),
}

pub fn storage_key(job_id: &JobId, file_name: &str) -> String {
    format!("{STORAGE_PREFIX}/{job_id}/{file_name}")
}

/// Directory the tool writes videos into for this script and quality.
pub fn expected_output_dir(
    workspace: &Path,
    script_path: &Path,
    quality: RenderQuality,
) -> PathBuf {
    let stem = script_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    workspace
        .join("media")
        .join("videos")
        .join(stem)
        .join(quality.profile_dir())
}

/// Find the artifact in `output_dir`.
///
/// Candidates are regular files whose extension is [`VIDEO_EXTENSION`]
/// (ASCII case-insensitive). A missing directory means the tool produced
/// nothing and is reported as [`LocateError::NotFound`].
pub async fn locate(
    output_dir: &Path,
    policy: ArtifactPolicy,
    job_id: &JobId,
) -> Result<Artifact, LocateError> {
    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LocateError::NotFound)
        }
        Err(e) => return Err(LocateError::Io(e)),
    };

    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_video = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION));
        if !is_video {
            continue;
        }
        // Non-UTF-8 names cannot become storage keys.
        if let Some(name) = entry.file_name().to_str() {
            candidates.push((name.to_string(), path));
        }
    }

    candidates.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    match (candidates.len(), policy) {
        (0, _) => Err(LocateError::NotFound),
        (1, _) | (_, ArtifactPolicy::FirstLexical) => {
            if candidates.len() > 1 {
                tracing::info!(
                    %job_id,
                    chosen = %candidates[0].0,
                    count = candidates.len(),
                    "Multiple artifacts found, taking first in lexical order"
                );
            }
            let (name, path) = candidates.swap_remove(0);
            Ok(Artifact::new(job_id, path, name))
        }
        (_, ArtifactPolicy::Reject) => Err(LocateError::Ambiguous {
            candidates: candidates.into_iter().map(|(name, _)| name).collect(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
