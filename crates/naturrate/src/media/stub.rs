//! Transcoder stand-in that needs no media toolkit.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{MediaTranscoder, MuxPlan};
use crate::error::MediaError;

/// Reports fixed durations and "muxes" by copying the video to the output.
/// Every plan it is asked to execute is recorded.
pub struct StubTranscoder {
    video_secs: f64,
    audio_secs: f64,
    fail_mux: Option<String>,
    plans: Mutex<Vec<MuxPlan>>,
}

impl Default for StubTranscoder {
    fn default() -> Self {
        Self {
            video_secs: 8.5,
            audio_secs: 7.0,
            fail_mux: None,
            plans: Mutex::new(Vec::new()),
        }
    }
}

impl StubTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_durations(mut self, video_secs: f64, audio_secs: f64) -> Self {
        self.video_secs = video_secs;
        self.audio_secs = audio_secs;
        self
    }

    pub fn failing_mux(mut self, stderr: &str) -> Self {
        self.fail_mux = Some(stderr.to_string());
        self
    }

    pub fn plans(&self) -> Vec<MuxPlan> {
        self.plans.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaTranscoder for StubTranscoder {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        // Narration audio is always written with an .mp3 extension
        let is_audio = path.extension().is_some_and(|ext| ext == "mp3");
        Ok(if is_audio {
            self.audio_secs
        } else {
            self.video_secs
        })
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        plan: &MuxPlan,
    ) -> Result<(), MediaError> {
        if let Ok(mut plans) = self.plans.lock() {
            plans.push(*plan);
        }
        if let Some(stderr) = &self.fail_mux {
            return Err(MediaError::ExitStatus {
                program: "ffmpeg".to_string(),
                code: Some(1),
                stderr: stderr.clone(),
            });
        }
        if !audio.exists() {
            return Err(MediaError::FileNotFound(audio.to_path_buf()));
        }
        tokio::fs::copy(video, output)
            .await
            .map_err(|source| MediaError::Spawn {
                program: "stub-mux".to_string(),
                source,
            })?;
        Ok(())
    }
}
