#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scenecast_cloud::memory::InMemoryObjectStore;
use scenecast_cloud::ObjectStore;
use scenecast_pipeline::{PipelineSettings, RenderPipeline};
use tempfile::TempDir;

pub const BUCKET: &str = "my-bucket";
pub const PUBLIC_BASE_URL: &str = "https://storage.example";

/// Maps the quality flag to the profile directory the real tool uses.
const PROFILE_FROM_FLAG: &str = r#"
case "$1" in
  -ql) profile=480p15 ;;
  -qm) profile=720p30 ;;
  -qh) profile=1080p60 ;;
  -qp) profile=1440p60 ;;
  -qk) profile=2160p60 ;;
  *) echo "unknown quality flag $1" >&2; exit 2 ;;
esac
stem=$(basename "$2" .py)
out="media/videos/$stem/$profile"
"#;

/// A tool that renders successfully, writing `scene.mp4` where the real
/// tool would.
pub fn render_ok() -> String {
    render_ok_then("")
}

/// Like [`render_ok`], running `extra` after the video is written.
pub fn render_ok_then(extra: &str) -> String {
    format!(
        "{PROFILE_FROM_FLAG}\
         mkdir -p \"$out/partial_movie_files\"\n\
         printf 'fake video' > \"$out/scene.mp4\"\n\
         echo \"File ready at $PWD/$out/scene.mp4\"\n\
         {extra}\n"
    )
}

/// A tool that exits zero after writing the given files into the output
/// directory.
pub fn render_files(names: &[&str]) -> String {
    let mut body = format!("{PROFILE_FROM_FLAG}mkdir -p \"$out\"\n");
    for name in names {
        body.push_str(&format!("printf 'v' > \"$out/{name}\"\n"));
    }
    body
}

/// A temp directory holding the fake tool and the workspace root, plus a
/// pipeline wired to an in-memory store.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<InMemoryObjectStore>,
    pub pipeline: RenderPipeline,
}

impl Harness {
    pub fn new(tool_body: &str) -> Self {
        Self::with_settings(tool_body, |_| {})
    }

    pub fn with_settings(tool_body: &str, configure: impl FnOnce(&mut PipelineSettings)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(InMemoryObjectStore::new(BUCKET, PUBLIC_BASE_URL));
        let settings = settings_in(&dir, tool_body, configure);
        let pipeline = RenderPipeline::new(settings, Some(store.clone() as Arc<dyn ObjectStore>));
        Self {
            dir,
            store,
            pipeline,
        }
    }

    /// A pipeline with no object store configured.
    pub fn unconfigured(tool_body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(InMemoryObjectStore::new(BUCKET, PUBLIC_BASE_URL));
        let settings = settings_in(&dir, tool_body, |_| {});
        Self {
            dir,
            store,
            pipeline: RenderPipeline::new(settings, None),
        }
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("workspaces")
    }

    /// Job workspaces still present under the root.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.workspace_root()) {
            Ok(entries) => entries
                .map(|e| e.expect("dir entry").path())
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => panic!("read workspace root: {e}"),
        }
    }

    /// Wait up to two seconds for background workspace removal.
    pub async fn wait_for_no_workspaces(&self) -> Vec<PathBuf> {
        for _ in 0..40 {
            let left = self.leftover_workspaces();
            if left.is_empty() {
                return left;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.leftover_workspaces()
    }
}

fn settings_in(
    dir: &TempDir,
    tool_body: &str,
    configure: impl FnOnce(&mut PipelineSettings),
) -> PipelineSettings {
    let tool = write_tool(dir.path(), tool_body);
    let mut settings = PipelineSettings {
        workspace_root: dir.path().join("workspaces"),
        tool: tool.display().to_string(),
        timeout: Duration::from_secs(30),
        ..Default::default()
    };
    configure(&mut settings);
    settings
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
