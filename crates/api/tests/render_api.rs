//! Integration tests for `POST /render`.
//!
//! Each test runs the real pipeline against a fake rendering tool and an
//! in-memory object store.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, post_json, post_raw, BUCKET, PUBLIC_BASE_URL, RENDER_OK};
use serde_json::json;

const SCRIPT: &str = "from manim import *\n\nclass Demo(Scene):\n    pass\n";

// ---------------------------------------------------------------------------
// Test: successful render returns a public URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_returns_video_url() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_json(t.app.clone(), "/render", json!({ "code": SCRIPT })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let job_id = json["job_id"].as_str().expect("job_id").to_string();
    assert_eq!(
        json["video_url"],
        format!("{PUBLIC_BASE_URL}/{BUCKET}/renders/{job_id}/scene.mp4")
    );
    assert!(t.store.get(&format!("renders/{job_id}/scene.mp4")).is_some());
    assert_eq!(t.leftover_workspaces(), 0);
}

#[tokio::test]
async fn render_accepts_quality_override() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_json(
        t.app.clone(),
        "/render",
        json!({ "code": SCRIPT, "quality": "low" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: request-shape problems are 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_code_is_bad_request() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_json(t.app.clone(), "/render", json!({ "code": "  " })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_REQUEST");
    assert!(json["error"].is_string());
    assert_eq!(t.leftover_workspaces(), 0);
}

#[tokio::test]
async fn missing_code_field_is_bad_request() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_json(t.app.clone(), "/render", json!({ "script": SCRIPT })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_raw(t.app.clone(), "/render", "{\"code\": ".to_string()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_quality_is_bad_request() {
    let t = build_test_app(RENDER_OK, true);

    let response = post_json(
        t.app.clone(),
        "/render",
        json!({ "code": SCRIPT, "quality": "ultra" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(t.leftover_workspaces(), 0);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let t = build_test_app(RENDER_OK, true);
    let huge = "x".repeat(8 * 1024);

    let response = post_json(t.app.clone(), "/render", json!({ "code": huge })).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "PAYLOAD_TOO_LARGE");
}

// ---------------------------------------------------------------------------
// Test: server-side failures are 500 with a typed code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unconfigured_storage_is_500_before_anything_else() {
    let t = build_test_app(RENDER_OK, false);

    // Even an unusable body reports the configuration problem.
    let response = post_raw(t.app.clone(), "/render", "not json".to_string()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "CONFIGURATION_MISSING");
    assert!(!t.workspace_root().exists());
}

#[tokio::test]
async fn syntax_error_returns_logs() {
    let t = build_test_app("echo 'SyntaxError: invalid syntax' >&2\nexit 1", true);

    let response = post_json(t.app.clone(), "/render", json!({ "code": "class (:" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "EXECUTION_FAILED");
    assert_eq!(json["logs"], "SyntaxError: invalid syntax\n");
    assert_eq!(t.leftover_workspaces(), 0);
}

#[tokio::test]
async fn missing_video_is_artifact_not_found() {
    let t = build_test_app("true", true);

    let response = post_json(t.app.clone(), "/render", json!({ "code": SCRIPT })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "ARTIFACT_NOT_FOUND");
}

#[tokio::test]
async fn visibility_failure_is_publish_failed() {
    let t = build_test_app(RENDER_OK, true);
    t.store.fail_visibility(true);

    let response = post_json(t.app.clone(), "/render", json!({ "code": SCRIPT })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PUBLISH_FAILED");
    assert!(json.get("logs").is_none());
    assert_eq!(t.leftover_workspaces(), 0);
}
