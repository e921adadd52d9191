use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::ApiError;
use crate::state::AppState;

/// Serves a locally stored video while its download token is valid.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound("Artifact not found".to_string());

    let path = state
        .artifacts
        .as_ref()
        .and_then(|store| store.resolve(&token))
        .ok_or_else(not_found)?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        log::warn!("Artifact for token {} unreadable: {}", token, e);
        not_found()
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(header::CONTENT_TYPE, "video/mp4")], body).into_response())
}
