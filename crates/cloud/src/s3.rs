//! S3-compatible object store.
//!
//! Works against AWS S3 and S3-compatible services (GCS interoperability
//! endpoint, MinIO, R2) via `STORAGE_ENDPOINT_URL`. Objects are made
//! public with the `public-read` canned ACL.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;

use crate::storage::{object_url, ObjectStore, StorageError, StoredObject};

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    /// Custom endpoint for S3-compatible services. Enables path-style
    /// addressing when set.
    pub endpoint_url: Option<String>,
    /// Base of public object URLs, e.g. `https://storage.googleapis.com`.
    pub public_base_url: String,
}

/// [`ObjectStore`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ObjectStore {
    /// Build a store from the ambient AWS configuration (environment,
    /// profile, instance metadata) plus `settings`.
    pub async fn connect(settings: S3Settings) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        tracing::info!(
            bucket = %settings.bucket,
            endpoint = settings.endpoint_url.as_deref().unwrap_or("default"),
            "S3 object store configured"
        );

        Self::from_client(client, settings.bucket, settings.public_base_url)
    }

    pub fn from_client(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key, size, "Object uploaded");

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        })
    }

    async fn set_public(&self, object: &StoredObject) -> Result<(), StorageError> {
        self.client
            .put_object_acl()
            .bucket(&object.bucket)
            .key(&object.key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Visibility {
                key: object.key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn public_url(&self, object: &StoredObject) -> Result<String, StorageError> {
        if self.public_base_url.trim().is_empty() {
            return Err(StorageError::Url {
                key: object.key.clone(),
                message: "no public base URL configured".to_string(),
            });
        }
        object_url(&self.public_base_url, &object.bucket, &object.key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
