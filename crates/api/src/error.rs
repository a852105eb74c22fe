use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use scenecast_core::error::CoreError;
use scenecast_pipeline::RenderError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`RenderError`] for pipeline failures and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses: `{"error", "code", "logs"?}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A render job failure from `scenecast_pipeline`.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A malformed request body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Render(err.into())
    }
}

impl AppError {
    /// Classify a body extraction failure. Oversized bodies keep their 413.
    pub fn from_json_rejection(rejection: JsonRejection, limit: usize) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge { limit }
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, logs) = match self {
            AppError::Render(err) => classify_render_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg, None),
            AppError::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Request body exceeds {limit} bytes"),
                None,
            ),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(logs) = logs {
            body["logs"] = json!(logs);
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Map a render failure to status, code, message and captured logs.
///
/// - `InvalidRequest` maps to 400.
/// - `Internal` maps to 500 with a sanitized message.
/// - Everything else maps to 500 with its own message.
fn classify_render_error(err: RenderError) -> (StatusCode, &'static str, String, Option<String>) {
    let code = err.code();
    let logs = err.logs().map(str::to_string);
    if matches!(err, RenderError::ConfigurationMissing(_)) {
        tracing::error!(error = %err, "Render requested without storage configured");
    }
    match err {
        RenderError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, code, msg, None),
        RenderError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal render error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "An internal error occurred".to_string(),
                None,
            )
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, code, other.to_string(), logs),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
