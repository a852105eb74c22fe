use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use scenecast_cloud::s3::S3Settings;
use scenecast_pipeline::PipelineSettings;

/// Default base of public object URLs.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// A configuration value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("{name} is invalid: {message}")]
pub struct ConfigError {
    pub name: &'static str,
    pub message: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. A missing
/// storage bucket is not an error: the server starts and rejects every
/// render with `CONFIGURATION_MISSING`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Always greater than the render
    /// timeout, so a slow render ends with a typed error instead of a 408.
    pub request_timeout_secs: u64,
    /// Largest accepted request body.
    pub max_script_bytes: usize,
    /// `None` when no bucket is configured.
    pub storage: Option<S3Settings>,
    pub pipeline: PipelineSettings,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default                          |
    /// |---------------------------|----------------------------------|
    /// | `HOST`                    | `0.0.0.0`                        |
    /// | `PORT`                    | `8080`                           |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS`    | `1800`                           |
    /// | `MAX_SCRIPT_BYTES`        | `1048576`                        |
    /// | `STORAGE_BUCKET`          | `GCS_BUCKET_NAME`, else unset    |
    /// | `STORAGE_ENDPOINT_URL`    | unset                            |
    /// | `STORAGE_PUBLIC_BASE_URL` | `https://storage.googleapis.com` |
    /// | `RENDER_TOOL`             | `manim`                          |
    /// | `RENDER_QUALITY`          | `medium`                         |
    /// | `RENDER_TIMEOUT_SECS`     | `1700`                           |
    /// | `WORKSPACE_ROOT`          | `<tmp>/scenecast`                |
    /// | `ARTIFACT_POLICY`         | `first`                          |
    /// | `MAX_CONCURRENT_RENDERS`  | `0` (no cap)                     |
    ///
    /// `REQUEST_TIMEOUT_SECS` must be greater than `RENDER_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "PORT", 8080)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            origin.parse::<HeaderValue>().map_err(|e| ConfigError {
                name: "CORS_ORIGINS",
                message: format!("'{origin}': {e}"),
            })?;
        }

        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 1800)?;
        let max_script_bytes: usize = parse_or(&var, "MAX_SCRIPT_BYTES", 1024 * 1024)?;

        let storage = var("STORAGE_BUCKET")
            .or_else(|| var("GCS_BUCKET_NAME"))
            .map(|bucket| S3Settings {
                bucket: bucket.trim().to_string(),
                endpoint_url: var("STORAGE_ENDPOINT_URL"),
                public_base_url: var("STORAGE_PUBLIC_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into()),
            });

        let defaults = PipelineSettings::default();
        let timeout_secs: u64 = parse_or(&var, "RENDER_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError {
                name: "RENDER_TIMEOUT_SECS",
                message: "must be greater than zero".into(),
            });
        }
        if request_timeout_secs <= timeout_secs {
            return Err(ConfigError {
                name: "REQUEST_TIMEOUT_SECS",
                message: format!(
                    "{request_timeout_secs}s must be greater than RENDER_TIMEOUT_SECS ({timeout_secs}s)"
                ),
            });
        }
        let pipeline = PipelineSettings {
            workspace_root: var("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            tool: var("RENDER_TOOL").unwrap_or(defaults.tool),
            default_quality: parse_or(&var, "RENDER_QUALITY", defaults.default_quality)?,
            timeout: Duration::from_secs(timeout_secs),
            artifact_policy: parse_or(&var, "ARTIFACT_POLICY", defaults.artifact_policy)?,
            max_concurrent_jobs: parse_or(
                &var,
                "MAX_CONCURRENT_RENDERS",
                defaults.max_concurrent_jobs,
            )?,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_script_bytes,
            storage,
            pipeline,
        })
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use scenecast_core::rendering::artifact::ArtifactPolicy;
    use scenecast_core::rendering::quality::RenderQuality;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 1800);
        assert_eq!(config.max_script_bytes, 1024 * 1024);
        assert!(config.storage.is_none());
        assert_eq!(config.pipeline.tool, "manim");
        assert_eq!(config.pipeline.default_quality, RenderQuality::Medium);
        assert_eq!(config.pipeline.timeout, Duration::from_secs(1700));
        assert_eq!(config.pipeline.artifact_policy, ArtifactPolicy::FirstLexical);
        assert_eq!(config.pipeline.max_concurrent_jobs, 0);
    }

    #[test]
    fn storage_from_bucket_variables() {
        let config = load(&[
            ("STORAGE_BUCKET", "my-bucket"),
            ("STORAGE_ENDPOINT_URL", "http://localhost:9000"),
        ])
        .unwrap();
        let storage = config.storage.expect("storage");
        assert_eq!(storage.bucket, "my-bucket");
        assert_eq!(storage.endpoint_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(storage.public_base_url, DEFAULT_PUBLIC_BASE_URL);
    }

    #[test]
    fn legacy_bucket_variable_is_a_fallback() {
        let config = load(&[("GCS_BUCKET_NAME", "legacy")]).unwrap();
        assert_eq!(config.storage.unwrap().bucket, "legacy");

        let config = load(&[("GCS_BUCKET_NAME", "legacy"), ("STORAGE_BUCKET", "new")]).unwrap();
        assert_eq!(config.storage.unwrap().bucket, "new");
    }

    #[test]
    fn blank_bucket_counts_as_missing() {
        let config = load(&[("STORAGE_BUCKET", "  ")]).unwrap();
        assert!(config.storage.is_none());
    }

    #[test]
    fn render_settings_are_parsed() {
        let config = load(&[
            ("RENDER_TOOL", "/opt/manim/bin/manim"),
            ("RENDER_QUALITY", "high"),
            ("RENDER_TIMEOUT_SECS", "60"),
            ("WORKSPACE_ROOT", "/var/lib/scenecast"),
            ("ARTIFACT_POLICY", "reject"),
            ("MAX_CONCURRENT_RENDERS", "3"),
        ])
        .unwrap();
        assert_eq!(config.pipeline.tool, "/opt/manim/bin/manim");
        assert_eq!(config.pipeline.default_quality, RenderQuality::High);
        assert_eq!(config.pipeline.timeout, Duration::from_secs(60));
        assert_eq!(config.pipeline.workspace_root, PathBuf::from("/var/lib/scenecast"));
        assert_eq!(config.pipeline.artifact_policy, ArtifactPolicy::Reject);
        assert_eq!(config.pipeline.max_concurrent_jobs, 3);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.name, "PORT");

        let err = load(&[("RENDER_QUALITY", "ultra")]).unwrap_err();
        assert_eq!(err.name, "RENDER_QUALITY");

        let err = load(&[("RENDER_TIMEOUT_SECS", "0")]).unwrap_err();
        assert_eq!(err.name, "RENDER_TIMEOUT_SECS");

        let err = load(&[("CORS_ORIGINS", "http://ok.example,bad\norigin")]).unwrap_err();
        assert_eq!(err.name, "CORS_ORIGINS");

        let err = load(&[("RENDER_TIMEOUT_SECS", "3600")]).unwrap_err();
        assert_eq!(err.name, "REQUEST_TIMEOUT_SECS");

        let err = load(&[("RENDER_TIMEOUT_SECS", "60"), ("REQUEST_TIMEOUT_SECS", "60")]).unwrap_err();
        assert_eq!(err.name, "REQUEST_TIMEOUT_SECS");
    }
}
