//! Builders for stub collaborators and test data.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use naturrate::error::StorageError;
use naturrate::media::StubTranscoder;
use naturrate::services::{Chapter, StubNarrator, StubSynthesizer, StubVideoUnderstanding};
use naturrate::storage::BlobStore;
use naturrate::Collaborators;

/// Stub collaborators with typed handles, so tests can inspect call counts
/// after the pipeline has consumed the trait objects.
pub struct Stubs {
    pub understanding: Arc<StubVideoUnderstanding>,
    pub narrator: Arc<StubNarrator>,
    pub synthesizer: Arc<StubSynthesizer>,
    pub transcoder: Arc<StubTranscoder>,
}

impl Stubs {
    pub fn collaborators(&self, blob_store: Arc<dyn BlobStore>) -> Collaborators {
        Collaborators {
            understanding: self.understanding.clone(),
            narrator: self.narrator.clone(),
            synthesizer: self.synthesizer.clone(),
            transcoder: self.transcoder.clone(),
            blob_store,
        }
    }
}

/// Builder for `Stubs`.
#[derive(Default)]
pub struct StubsBuilder {
    understanding: Option<StubVideoUnderstanding>,
    narrator: Option<StubNarrator>,
    synthesizer: Option<StubSynthesizer>,
    transcoder: Option<StubTranscoder>,
}

impl StubsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn understanding(mut self, stub: StubVideoUnderstanding) -> Self {
        self.understanding = Some(stub);
        self
    }

    pub fn narrator(mut self, stub: StubNarrator) -> Self {
        self.narrator = Some(stub);
        self
    }

    pub fn synthesizer(mut self, stub: StubSynthesizer) -> Self {
        self.synthesizer = Some(stub);
        self
    }

    pub fn transcoder(mut self, stub: StubTranscoder) -> Self {
        self.transcoder = Some(stub);
        self
    }

    pub fn build(self) -> Stubs {
        Stubs {
            understanding: Arc::new(self.understanding.unwrap_or_default()),
            narrator: Arc::new(self.narrator.unwrap_or_default()),
            synthesizer: Arc::new(self.synthesizer.unwrap_or_default()),
            transcoder: Arc::new(self.transcoder.unwrap_or_default()),
        }
    }
}

/// Builder for a `Chapter`.
pub struct ChapterBuilder {
    number: u32,
    start: f64,
    end: f64,
    title: String,
    summary: String,
}

impl ChapterBuilder {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            start: 0.0,
            end: 1.0,
            title: format!("Chapter title {}", number),
            summary: format!("Chapter summary {}", number),
        }
    }

    pub fn span(mut self, start: f64, end: f64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn build(self) -> Chapter {
        Chapter {
            number: self.number,
            start: self.start,
            end: self.end,
            title: self.title,
            summary: self.summary,
        }
    }
}

/// Blob store whose uploads always fail.
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for FailingStore {
    async fn put(&self, key: &str, _path: &Path) -> Result<(), StorageError> {
        Err(StorageError::Upload {
            key: key.to_string(),
            message: self.message.clone(),
        })
    }

    async fn signed_url(&self, key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Err(StorageError::Sign {
            key: key.to_string(),
            message: self.message.clone(),
        })
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}
