//! Job model: identifiers, stages, statuses and the stored job record.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize;

/// Message recorded on a freshly submitted job.
pub const UPLOAD_STARTED_MESSAGE: &str = "Video upload started";

/// Stage of the narration pipeline.
///
/// Variants are declared in pipeline order; the derived `Ord` is the
/// transition order enforced by the job store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    Indexing,
    Summarizing,
    Narrating,
    Synthesizing,
    Muxing,
    Uploading,
    Completed,
    Failed,
}

impl JobStage {
    /// Status implied by this stage.
    pub fn status(self) -> JobStatus {
        match self {
            JobStage::Completed => JobStatus::Completed,
            JobStage::Failed => JobStatus::Error,
            _ => JobStatus::Processing,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }

    /// Default progress message shown while the stage runs.
    pub fn default_message(self) -> &'static str {
        match self {
            JobStage::Queued => UPLOAD_STARTED_MESSAGE,
            JobStage::Indexing => "Uploading video to index",
            JobStage::Summarizing => "Generating chapters",
            JobStage::Narrating => "Creating narration script",
            JobStage::Synthesizing => "Generating audio",
            JobStage::Muxing => "Creating final video",
            JobStage::Uploading => "Uploading final video",
            JobStage::Completed => "Processing completed",
            JobStage::Failed => "Processing failed",
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Queued => write!(f, "Queued"),
            JobStage::Indexing => write!(f, "Indexing"),
            JobStage::Summarizing => write!(f, "Summarizing"),
            JobStage::Narrating => write!(f, "Narrating"),
            JobStage::Synthesizing => write!(f, "Synthesizing"),
            JobStage::Muxing => write!(f, "Muxing"),
            JobStage::Uploading => write!(f, "Uploading"),
            JobStage::Completed => write!(f, "Completed"),
            JobStage::Failed => write!(f, "Failed"),
        }
    }
}

/// Terminal-aware status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

/// A narration job as held by the job store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier, also used as the video id by API consumers.
    pub job_id: String,
    /// Original filename of the upload.
    pub filename: String,
    /// Current status.
    pub status: JobStatus,
    /// Current stage.
    pub stage: JobStage,
    /// Current step message.
    pub message: String,
    /// Chapter document fed to the narration generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters_text: Option<String>,
    /// Generated narration script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration_script: Option<String>,
    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of accepted updates; bumps on every change.
    pub revision: u64,
}

impl Job {
    /// Creates a queued job for a fresh upload.
    pub fn new(job_id: &str, filename: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            filename: filename.to_string(),
            status: JobStatus::Processing,
            stage: JobStage::Queued,
            message: UPLOAD_STARTED_MESSAGE.to_string(),
            chapters_text: None,
            narration_script: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            revision: 0,
        }
    }
}

/// A change to apply to a stored job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub stage: JobStage,
    pub message: String,
    pub chapters_text: Option<String>,
    pub narration_script: Option<String>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn stage(stage: JobStage) -> Self {
        Self {
            stage,
            message: stage.default_message().to_string(),
            chapters_text: None,
            narration_script: None,
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self::stage(JobStage::Completed)
    }

    /// A failure update; the error text doubles as the status message.
    pub fn failed(error: &str) -> Self {
        Self {
            stage: JobStage::Failed,
            message: error.to_string(),
            chapters_text: None,
            narration_script: None,
            error: Some(error.to_string()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_results(mut self, chapters_text: &str, narration_script: &str) -> Self {
        self.chapters_text = Some(chapters_text.to_string());
        self.narration_script = Some(narration_script.to_string());
        self
    }
}

/// Generates a human-readable job id: `video_{stem}_{YYYYMMDD_HHMMSS}_{suffix}`.
pub fn generate_job_id(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = sanitize::sanitize_stem(stem);
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("video_{}_{}_{}", stem, timestamp, &uuid[..8])
}
