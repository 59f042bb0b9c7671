//! Editor configuration endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::editor::{EditorConfig, ToolbarButton, toolbar};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EditorResponse {
    pub config: EditorConfig,
    pub toolbar: Vec<ToolbarButton>,
}

/// GET /api/editor
async fn editor_config(State(state): State<AppState>) -> Json<EditorResponse> {
    let config = state.editor().clone();
    let toolbar = toolbar(&config);
    Json(EditorResponse { config, toolbar })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/editor", get(editor_config))
}
