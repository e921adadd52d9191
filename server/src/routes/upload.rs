use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use naturrate::job::UPLOAD_STARTED_MESSAGE;

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

/// Used when the client sends no file name.
const FALLBACK_FILENAME: &str = "upload.mp4";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub video_id: String,
    pub message: String,
}

/// Accepts a video and starts processing it in the background.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let bytes = field.bytes().await?;

        let video_id = state.orchestrator.submit(&filename, &bytes).await?;
        return Ok(Json(UploadResponse {
            video_id,
            message: UPLOAD_STARTED_MESSAGE.to_string(),
        }));
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}
