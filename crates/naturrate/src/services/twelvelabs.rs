//! TwelveLabs video understanding client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::http::{build_client, endpoint, file_body, read_json, send, UPLOAD_TIMEOUT};
use super::{Chapter, IndexTask, VideoUnderstanding};
use crate::config::TwelveLabsConfig;
use crate::error::ServiceError;
use crate::sanitize::redact_path;

const SERVICE: &str = "twelvelabs";

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_id: Option<String>,
}

impl From<TaskResponse> for IndexTask {
    fn from(task: TaskResponse) -> Self {
        IndexTask {
            task_id: task.id,
            status: task.status.unwrap_or_else(|| "pending".to_string()),
            video_id: task.video_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    video_id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    #[serde(default)]
    chapters: Vec<ChapterResponse>,
}

#[derive(Debug, Deserialize)]
struct ChapterResponse {
    chapter_number: u32,
    start_sec: f64,
    end_sec: f64,
    #[serde(default)]
    chapter_title: String,
    #[serde(default)]
    chapter_summary: String,
}

impl From<ChapterResponse> for Chapter {
    fn from(c: ChapterResponse) -> Self {
        Chapter {
            number: c.chapter_number,
            start: c.start_sec,
            end: c.end_sec,
            title: c.chapter_title,
            summary: c.chapter_summary,
        }
    }
}

pub struct TwelveLabsClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl TwelveLabsClient {
    pub fn new(
        config: &TwelveLabsConfig,
        api_key: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(request_timeout)?,
            base_url: config.base_url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl VideoUnderstanding for TwelveLabsClient {
    async fn create_index_task(
        &self,
        index_id: &str,
        video: &Path,
    ) -> Result<IndexTask, ServiceError> {
        let (body, len) = file_body(video)
            .await
            .map_err(|source| ServiceError::Io {
                service: SERVICE,
                path: video.to_path_buf(),
                source,
            })?;

        debug!(
            "Creating index task for {} ({} bytes)",
            redact_path(video),
            len
        );

        let part = Part::stream_with_length(body, len).file_name(redact_path(video));
        let form = Form::new()
            .text("index_id", index_id.to_string())
            .part("video_file", part);

        let request = self
            .client
            .post(endpoint(&self.base_url, "tasks"))
            .header("x-api-key", self.api_key.expose_secret())
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form);

        let task: TaskResponse = read_json(SERVICE, send(SERVICE, request).await?).await?;
        Ok(task.into())
    }

    async fn get_index_task(&self, task_id: &str) -> Result<IndexTask, ServiceError> {
        let request = self
            .client
            .get(endpoint(&self.base_url, &format!("tasks/{}", task_id)))
            .header("x-api-key", self.api_key.expose_secret());

        let task: TaskResponse = read_json(SERVICE, send(SERVICE, request).await?).await?;
        Ok(task.into())
    }

    async fn summarize_chapters(&self, video_id: &str) -> Result<Vec<Chapter>, ServiceError> {
        let request = self
            .client
            .post(endpoint(&self.base_url, "summarize"))
            .header("x-api-key", self.api_key.expose_secret())
            .json(&SummarizeRequest {
                video_id,
                kind: "chapter",
            });

        let summary: SummarizeResponse = read_json(SERVICE, send(SERVICE, request).await?).await?;
        Ok(summary.chapters.into_iter().map(Chapter::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http::parse_json;

    #[test]
    fn test_task_response_defaults_to_pending() {
        let task: TaskResponse = parse_json(SERVICE, r#"{"_id": "task-1"}"#).unwrap();
        let task = IndexTask::from(task);
        assert_eq!(task.task_id, "task-1");
        assert_eq!(task.status, "pending");
        assert!(task.video_id.is_none());
    }

    #[test]
    fn test_task_response_with_video() {
        let task: TaskResponse = parse_json(
            SERVICE,
            r#"{"_id": "task-1", "status": "ready", "video_id": "vid-9", "index_id": "idx"}"#,
        )
        .unwrap();
        let task = IndexTask::from(task);
        assert!(task.is_ready());
        assert_eq!(task.video_id.as_deref(), Some("vid-9"));
    }

    #[test]
    fn test_summarize_request_shape() {
        let body = serde_json::to_value(SummarizeRequest {
            video_id: "vid-9",
            kind: "chapter",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"video_id": "vid-9", "type": "chapter"}));
    }

    #[test]
    fn test_summarize_response_to_chapters() {
        let summary: SummarizeResponse = parse_json(
            SERVICE,
            r#"{
                "id": "sum-1",
                "summarize_type": "chapter",
                "chapters": [
                    {"chapter_number": 1, "start_sec": 0, "end_sec": 12.5,
                     "chapter_title": "Dawn", "chapter_summary": "Birds wake."}
                ]
            }"#,
        )
        .unwrap();
        let chapters: Vec<Chapter> = summary.chapters.into_iter().map(Chapter::from).collect();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Dawn");
        assert_eq!(chapters[0].end, 12.5);
    }
}
