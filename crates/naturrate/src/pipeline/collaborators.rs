use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ServiceMode};
use crate::error::Result;
use crate::media::{FfmpegTranscoder, MediaTranscoder, StubTranscoder};
use crate::services::{
    ElevenLabsSynthesizer, NarrationGenerator, OpenAiNarrator, SpeechSynthesizer,
    StubNarrator, StubSynthesizer, StubVideoUnderstanding, TwelveLabsClient, VideoUnderstanding,
};
use crate::storage::BlobStore;

/// Everything the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub understanding: Arc<dyn VideoUnderstanding>,
    pub narrator: Arc<dyn NarrationGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcoder: Arc<dyn MediaTranscoder>,
    pub blob_store: Arc<dyn BlobStore>,
}

impl Collaborators {
    /// Builds the collaborators selected by `services.mode`.
    pub fn from_config(config: &Config, blob_store: Arc<dyn BlobStore>) -> Result<Self> {
        match config.services.mode {
            ServiceMode::Live => Self::live(config, blob_store),
            ServiceMode::Stub => Ok(Self::stub(blob_store)),
        }
    }

    /// Vendor HTTP clients and the ffmpeg transcoder. Resolves all API keys.
    pub fn live(config: &Config, blob_store: Arc<dyn BlobStore>) -> Result<Self> {
        let timeout = Duration::from_secs(config.services.request_timeout_secs);

        let twelvelabs_key = config.twelvelabs.api_key.resolve("TwelveLabs API key")?;
        let openai_key = config.openai.api_key.resolve("OpenAI API key")?;
        let elevenlabs_key = config.elevenlabs.api_key.resolve("ElevenLabs API key")?;

        Ok(Self {
            understanding: Arc::new(TwelveLabsClient::new(
                &config.twelvelabs,
                twelvelabs_key,
                timeout,
            )?),
            narrator: Arc::new(OpenAiNarrator::new(&config.openai, openai_key, timeout)?),
            synthesizer: Arc::new(ElevenLabsSynthesizer::new(
                &config.elevenlabs,
                elevenlabs_key,
                timeout,
            )?),
            transcoder: Arc::new(FfmpegTranscoder::new(&config.media)),
            blob_store,
        })
    }

    /// In-process stand-ins; needs no credentials, network or ffmpeg.
    pub fn stub(blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            understanding: Arc::new(StubVideoUnderstanding::new()),
            narrator: Arc::new(StubNarrator::new()),
            synthesizer: Arc::new(StubSynthesizer::new()),
            transcoder: Arc::new(StubTranscoder::new()),
            blob_store,
        }
    }
}
