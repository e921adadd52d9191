//! In-process stand-ins for the AI vendors.
//!
//! Used when `services.mode` is `stub` and by tests. Each stub counts its
//! calls and can be configured to fail.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Chapter, IndexTask, NarrationGenerator, SpeechSynthesizer, VideoUnderstanding};
use crate::error::ServiceError;

fn stub_failure(service: &'static str, body: &str) -> ServiceError {
    ServiceError::Status {
        service,
        status: 500,
        body: body.to_string(),
    }
}

pub fn sample_chapters() -> Vec<Chapter> {
    vec![
        Chapter {
            number: 1,
            start: 0.0,
            end: 4.0,
            title: "Morning on the marsh".to_string(),
            summary: "Mist lifts off the water as herons begin to feed.".to_string(),
        },
        Chapter {
            number: 2,
            start: 4.0,
            end: 8.5,
            title: "The hunt".to_string(),
            summary: "A heron stalks the shallows and strikes.".to_string(),
        },
    ]
}

/// Video understanding stub: tasks report `indexing` for a number of polls,
/// then settle on a configurable terminal status.
pub struct StubVideoUnderstanding {
    final_status: String,
    polls_before_done: usize,
    chapters: Vec<Chapter>,
    fail_create: Option<String>,
    fail_summarize: Option<String>,
    create_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    summarize_calls: AtomicUsize,
}

impl Default for StubVideoUnderstanding {
    fn default() -> Self {
        Self {
            final_status: IndexTask::READY.to_string(),
            polls_before_done: 1,
            chapters: sample_chapters(),
            fail_create: None,
            fail_summarize: None,
            create_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
        }
    }
}

impl StubVideoUnderstanding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal status reported once polling completes.
    pub fn with_final_status(mut self, status: &str) -> Self {
        self.final_status = status.to_string();
        self
    }

    /// Number of polls answered with `indexing` first.
    pub fn with_polls_before_done(mut self, polls: usize) -> Self {
        self.polls_before_done = polls;
        self
    }

    /// Never finishes indexing.
    pub fn never_ready(self) -> Self {
        self.with_polls_before_done(usize::MAX)
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub fn failing_create(mut self, body: &str) -> Self {
        self.fail_create = Some(body.to_string());
        self
    }

    pub fn failing_summarize(mut self, body: &str) -> Self {
        self.fail_summarize = Some(body.to_string());
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoUnderstanding for StubVideoUnderstanding {
    async fn create_index_task(
        &self,
        _index_id: &str,
        video: &Path,
    ) -> Result<IndexTask, ServiceError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(body) = &self.fail_create {
            return Err(stub_failure("twelvelabs", body));
        }
        if !video.exists() {
            return Err(ServiceError::Io {
                service: "twelvelabs",
                path: video.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "upload missing"),
            });
        }
        Ok(IndexTask {
            task_id: format!("stub-task-{}", call + 1),
            status: "pending".to_string(),
            video_id: None,
        })
    }

    async fn get_index_task(&self, task_id: &str) -> Result<IndexTask, ServiceError> {
        let polls = self.poll_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let status = if polls > self.polls_before_done {
            self.final_status.clone()
        } else {
            "indexing".to_string()
        };
        let video_id = (status == IndexTask::READY).then(|| format!("{}-video", task_id));
        Ok(IndexTask {
            task_id: task_id.to_string(),
            status,
            video_id,
        })
    }

    async fn summarize_chapters(&self, _video_id: &str) -> Result<Vec<Chapter>, ServiceError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_summarize {
            Some(body) => Err(stub_failure("twelvelabs", body)),
            None => Ok(self.chapters.clone()),
        }
    }
}

/// Narration stub returning a fixed script.
pub struct StubNarrator {
    script: String,
    fail: Option<String>,
    calls: AtomicUsize,
    last_input: Mutex<Option<String>>,
}

impl Default for StubNarrator {
    fn default() -> Self {
        Self {
            script: "At first light the marsh stirs. A heron waits, then strikes.".to_string(),
            fail: None,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }
}

impl StubNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: &str) -> Self {
        self.script = script.to_string();
        self
    }

    pub fn failing(mut self, body: &str) -> Self {
        self.fail = Some(body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The chapter document passed to the last call.
    pub fn last_input(&self) -> Option<String> {
        self.last_input.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl NarrationGenerator for StubNarrator {
    async fn generate(&self, chapters_text: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_input.lock() {
            *last = Some(chapters_text.to_string());
        }
        match &self.fail {
            Some(body) => Err(stub_failure("openai", body)),
            None => Ok(self.script.clone()),
        }
    }
}

/// Speech stub returning fixed bytes.
pub struct StubSynthesizer {
    audio: Vec<u8>,
    fail: Option<String>,
    calls: AtomicUsize,
}

impl Default for StubSynthesizer {
    fn default() -> Self {
        Self {
            audio: b"ID3stub-narration-audio".to_vec(),
            fail: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl StubSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, audio: &[u8]) -> Self {
        self.audio = audio.to_vec();
        self
    }

    pub fn failing(mut self, body: &str) -> Self {
        self.fail = Some(body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail {
            Some(body) => Err(stub_failure("elevenlabs", body)),
            None => Ok(self.audio.clone()),
        }
    }
}
