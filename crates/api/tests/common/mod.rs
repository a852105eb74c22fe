#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use scenecast_api::app::build_app;
use scenecast_api::config::ServerConfig;
use scenecast_api::state::AppState;
use scenecast_cloud::memory::InMemoryObjectStore;
use scenecast_cloud::ObjectStore;
use scenecast_pipeline::{PipelineSettings, RenderPipeline};

pub const BUCKET: &str = "my-bucket";
pub const PUBLIC_BASE_URL: &str = "https://storage.example";

/// A tool that writes `scene.mp4` where the real tool would for `-qm`
/// and `-ql`.
pub const RENDER_OK: &str = r#"
case "$1" in
  -ql) profile=480p15 ;;
  -qm) profile=720p30 ;;
  *) echo "unexpected quality flag $1" >&2; exit 2 ;;
esac
out="media/videos/$(basename "$2" .py)/$profile"
mkdir -p "$out"
printf 'fake video' > "$out/scene.mp4"
"#;

/// An application wired to a fake rendering tool and an in-memory store.
pub struct TestApp {
    pub dir: TempDir,
    pub store: Arc<InMemoryObjectStore>,
    pub app: Router,
}

impl TestApp {
    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("workspaces")
    }

    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.workspace_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout, and a 4 KiB body limit.
pub fn test_config(dir: &Path, tool: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_script_bytes: 4096,
        storage: None,
        pipeline: PipelineSettings {
            workspace_root: dir.join("workspaces"),
            tool: tool.display().to_string(),
            timeout: Duration::from_secs(10),
            ..Default::default()
        },
    }
}

/// Build the full application with the fake tool `tool_body` and, when
/// `configured`, an in-memory object store.
pub fn build_test_app(tool_body: &str, configured: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let tool = write_tool(dir.path(), tool_body);
    let config = test_config(dir.path(), &tool);

    let store = Arc::new(InMemoryObjectStore::new(BUCKET, PUBLIC_BASE_URL));
    let object_store = configured.then(|| store.clone() as Arc<dyn ObjectStore>);
    let pipeline = Arc::new(RenderPipeline::new(config.pipeline.clone(), object_store));

    let state = AppState {
        config: Arc::new(config),
        pipeline,
    };

    TestApp {
        dir,
        store,
        app: build_app(state),
    }
}

/// Write an executable bash script standing in for the rendering tool.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-manim");
    std::fs::write(&path, format!("#!/usr/bin/env bash\n{body}\n")).expect("write tool");
    let mut perms = std::fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod");
    path
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

/// Send a POST request with a raw body labelled as JSON.
pub async fn post_raw(app: Router, uri: &str, body: String) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
