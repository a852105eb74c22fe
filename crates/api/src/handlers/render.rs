//! Render handler: script in, public video URL out.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use scenecast_core::rendering::quality::RenderQuality;
use scenecast_core::types::JobId;
use scenecast_pipeline::RenderRequest;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /render`.
#[derive(Debug, Deserialize)]
pub struct RenderBody {
    /// Scene script source, passed to the rendering tool unchanged.
    pub code: String,
    /// Quality preset name; the server default when absent.
    #[serde(default)]
    pub quality: Option<String>,
}

/// Successful render.
#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub video_url: String,
    pub job_id: JobId,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /render
///
/// Runs one render job to completion. The connection stays open for the
/// whole render; a dropped connection cancels the job.
pub async fn render(
    State(state): State<AppState>,
    payload: Result<Json<RenderBody>, JsonRejection>,
) -> AppResult<Json<RenderResponse>> {
    // Unconfigured storage wins over any request problem.
    state.pipeline.ensure_configured()?;

    let Json(body) = payload
        .map_err(|rejection| AppError::from_json_rejection(rejection, state.config.max_script_bytes))?;

    let quality = body
        .quality
        .as_deref()
        .map(str::parse::<RenderQuality>)
        .transpose()?;

    let request = RenderRequest {
        source: body.code,
        quality,
    };
    let success = state.pipeline.submit_request(request).await?;

    Ok(Json(RenderResponse {
        video_url: success.video_url,
        job_id: success.job_id,
    }))
}
