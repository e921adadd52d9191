use axum::extract::{Path, State};
use axum::Json;

use naturrate::VideoResult;

use crate::error::ApiError;
use crate::state::AppState;

/// Download link and texts for a finished video. Every call mints a new link.
pub async fn get_video_result(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResult>, ApiError> {
    let result = state.orchestrator.get_result(&video_id).await?;
    Ok(Json(result))
}
