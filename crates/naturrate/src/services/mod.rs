//! Clients for the external AI vendors.
//!
//! Each vendor sits behind a trait so the pipeline can run against the
//! live HTTP clients or the in-process stand-ins in [`stub`].

pub mod elevenlabs;
pub mod http;
pub mod openai;
pub mod stub;
pub mod twelvelabs;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::OpenAiNarrator;
pub use stub::{StubNarrator, StubSynthesizer, StubVideoUnderstanding};
pub use twelvelabs::TwelveLabsClient;

/// One chapter of a video summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub number: u32,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
    pub title: String,
    pub summary: String,
}

/// An indexing task as reported by the video understanding service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTask {
    pub task_id: String,
    pub status: String,
    /// Identifier of the indexed video, known once indexing progressed.
    pub video_id: Option<String>,
}

impl IndexTask {
    pub const READY: &'static str = "ready";
    pub const FAILED: &'static str = "failed";

    pub fn is_ready(&self) -> bool {
        self.status == Self::READY
    }

    /// Terminal states end polling; only `ready` is a success.
    pub fn is_terminal(&self) -> bool {
        self.status == Self::READY || self.status == Self::FAILED
    }
}

/// Indexes uploaded videos and produces chapter summaries.
#[async_trait]
pub trait VideoUnderstanding: Send + Sync {
    /// Starts indexing `video` into `index_id`.
    async fn create_index_task(&self, index_id: &str, video: &Path)
        -> Result<IndexTask, ServiceError>;

    /// Fetches the current state of an indexing task.
    async fn get_index_task(&self, task_id: &str) -> Result<IndexTask, ServiceError>;

    /// Requests a chapter summary of an indexed video.
    async fn summarize_chapters(&self, video_id: &str) -> Result<Vec<Chapter>, ServiceError>;
}

/// Turns a chapter document into a narration script.
#[async_trait]
pub trait NarrationGenerator: Send + Sync {
    async fn generate(&self, chapters_text: &str) -> Result<String, ServiceError>;
}

/// Renders narration text as encoded audio (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ServiceError>;
}
