//! Artifact publication: upload, make public, issue URL.

use std::fmt;

use scenecast_cloud::{ObjectStore, StorageError};
use scenecast_core::rendering::artifact::{Artifact, PublishedArtifact};

/// Content type of every published artifact.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Step of publication that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    /// Reading the local artifact.
    Read,
    Upload,
    /// The object is stored but still private.
    Visibility,
    Url,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Upload => "upload",
            Self::Visibility => "visibility",
            Self::Url => "url",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} step failed: {reason}")]
pub struct PublishError {
    pub stage: PublishStage,
    pub reason: String,
}

impl From<StorageError> for PublishError {
    fn from(err: StorageError) -> Self {
        let stage = match &err {
            StorageError::Upload { .. } => PublishStage::Upload,
            StorageError::Visibility { .. } => PublishStage::Visibility,
            StorageError::Url { .. } => PublishStage::Url,
        };
        Self {
            stage,
            reason: err.to_string(),
        }
    }
}

/// Publishes artifacts to one object store. One attempt per call.
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Upload `artifact` under its storage key, make it public, and return
    /// its URL. Every step must succeed; a stored-but-private object is a
    /// failure.
    pub async fn publish(&self, artifact: &Artifact) -> Result<PublishedArtifact, PublishError> {
        let bytes = tokio::fs::read(artifact.local_path())
            .await
            .map_err(|e| PublishError {
                stage: PublishStage::Read,
                reason: format!("failed to read artifact '{}': {e}", artifact.file_name()),
            })?;
        let size = bytes.len();

        let object = self
            .store
            .put(artifact.storage_key(), bytes, VIDEO_CONTENT_TYPE)
            .await?;
        tracing::info!(
            bucket = %object.bucket,
            key = %object.key,
            size,
            "Artifact uploaded"
        );

        self.store.set_public(&object).await?;
        let url = self.store.public_url(&object).await?;

        tracing::info!(key = %object.key, %url, "Artifact published");

        Ok(PublishedArtifact {
            key: object.key,
            url,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
