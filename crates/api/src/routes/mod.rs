pub mod health;
pub mod render;

use axum::Router;

use crate::state::AppState;

/// Build the render route tree.
///
/// ```text
/// /render                                          POST   render a script
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(render::router())
}
