//! HTTP client for the render service.
//!
//! Wraps `POST /render` using [`reqwest`], for backends that hand scene
//! scripts to a remote renderer and store the returned video URL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default request timeout. Renders are synchronous and slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Placeholder left in sample environment files.
const UNSET_URL_PLACEHOLDER: &str = "USER_MUST_PROVIDE_THIS_URL";

/// HTTP client for one render service.
#[derive(Debug, Clone)]
pub struct RendererClient {
    client: reqwest::Client,
    base_url: String,
}

/// A finished render.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedVideo {
    pub video_url: String,
    /// Absent when the service answers with only `video_url`.
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Serialize)]
struct RenderBody<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

/// Error body returned by the render service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
    logs: Option<String>,
}

/// Errors from the render client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No usable service URL was configured.
    #[error("Render service is not configured; set the renderer URL")]
    NotConfigured,

    /// The service answered with a render failure.
    #[error("Render failed: {message}")]
    Render {
        message: String,
        /// Machine-readable failure code, when the service sent one.
        code: Option<String>,
        /// Rendering tool output, when the service sent any.
        logs: Option<String>,
    },

    /// No answer within the client timeout.
    #[error("Render request timed out; the animation may be too complex")]
    TimedOut,

    /// Nothing accepted the connection.
    #[error("Cannot connect to render service at {0}")]
    Unreachable(String),

    /// Any other transport failure.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RendererClient {
    /// Create a client for the service at `base_url` with [`DEFAULT_TIMEOUT`].
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() || trimmed == UNSET_URL_PLACEHOLDER {
            return Err(ClientError::NotConfigured);
        }
        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Render `code` at the service's default quality and return the
    /// video URL.
    pub async fn render(&self, code: &str) -> Result<String, ClientError> {
        self.render_job(code, None).await.map(|video| video.video_url)
    }

    /// Render `code`, optionally choosing a quality preset by name.
    pub async fn render_job(
        &self,
        code: &str,
        quality: Option<&str>,
    ) -> Result<RenderedVideo, ClientError> {
        let url = format!("{}/render", self.base_url);
        tracing::info!(%url, bytes = code.len(), "Sending render job");

        let response = self
            .client
            .post(&url)
            .json(&RenderBody { code, quality })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if status.is_success() {
            if let Ok(video) = serde_json::from_slice::<RenderedVideo>(&body) {
                tracing::info!(
                    url = %video.video_url,
                    job_id = video.job_id.as_deref(),
                    "Render job complete"
                );
                return Ok(video);
            }
        }

        let err = match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(parsed) => ClientError::Render {
                message: parsed
                    .error
                    .unwrap_or_else(|| format!("render service returned {status}")),
                code: parsed.code,
                logs: parsed.logs,
            },
            Err(_) => ClientError::Render {
                message: format!("render service returned {status}"),
                code: None,
                logs: None,
            },
        };
        tracing::warn!(%status, error = %err, "Render job failed");
        Err(err)
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::TimedOut
        } else if err.is_connect() {
            ClientError::Unreachable(self.base_url.clone())
        } else {
            ClientError::Transport(err)
        }
    }
}
