//! Media toolkit boundary: duration probing and audio/video muxing.

pub mod ffmpeg;
pub mod stub;

use std::path::Path;

use async_trait::async_trait;

use crate::error::MediaError;

pub use ffmpeg::FfmpegTranscoder;
pub use stub::StubTranscoder;

/// How narration audio is fitted onto a video.
///
/// Audio longer than the video is clipped to the video's length; shorter
/// audio is left as is (never padded, never looped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuxPlan {
    pub video_secs: f64,
    pub audio_secs: f64,
    /// Duration the audio input is limited to, if any.
    pub clip_audio_to: Option<f64>,
}

impl MuxPlan {
    pub fn new(video_secs: f64, audio_secs: f64) -> Self {
        let clip_audio_to = (audio_secs > video_secs).then_some(video_secs);
        Self {
            video_secs,
            audio_secs,
            clip_audio_to,
        }
    }
}

#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Container duration of a media file, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError>;

    /// Writes `output`: the video stream of `video` with `audio` as its only
    /// audio track, fitted according to `plan`.
    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        plan: &MuxPlan,
    ) -> Result<(), MediaError>;
}
