//! Object store contract shared by every storage backend.

use async_trait::async_trait;
use url::Url;

/// Handle to an object that has been stored (but not necessarily published).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
}

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object could not be written.
    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    /// The object exists but its visibility could not be changed.
    #[error("making '{key}' public failed: {message}")]
    Visibility { key: String, message: String },

    /// No public URL could be issued for the object.
    #[error("resolving public URL for '{key}' failed: {message}")]
    Url { key: String, message: String },
}

/// Blob store with put / publish / URL-issue operations.
///
/// Implementations are shared process-wide behind an `Arc` and must not
/// hold per-request state.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every object of this store lives in.
    fn bucket(&self) -> &str;

    /// Store `bytes` under `key`, replacing any previous object.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError>;

    /// Make a stored object readable without credentials.
    async fn set_public(&self, object: &StoredObject) -> Result<(), StorageError>;

    /// Durable public URL of a stored object.
    async fn public_url(&self, object: &StoredObject) -> Result<String, StorageError>;
}

/// Join a public base URL, bucket and key into an object URL.
///
/// Each key segment is percent-encoded as a path segment; the `/`
/// separators are kept. Fails when `base_url` is not an absolute URL.
pub fn object_url(base_url: &str, bucket: &str, key: &str) -> Result<String, StorageError> {
    let invalid = |message: String| StorageError::Url {
        key: key.to_string(),
        message,
    };
    let mut url = Url::parse(base_url).map_err(|e| invalid(format!("'{base_url}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| invalid(format!("'{base_url}' cannot carry a path")))?
        .pop_if_empty()
        .push(bucket)
        .extend(key.split('/'));
    Ok(url.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
