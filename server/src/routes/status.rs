use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{Stream, StreamExt};

use naturrate::Job;

use crate::error::ApiError;
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Server-sent status events for one video. The stream closes after the
/// job completes or fails.
pub async fn video_status(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = state
        .orchestrator
        .subscribe(&video_id)
        .map(|snapshot| Event::default().json_data(&snapshot));

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// Current job record, without streaming.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .orchestrator
        .get_status(&video_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
}
