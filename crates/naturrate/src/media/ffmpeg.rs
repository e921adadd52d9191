//! `ffmpeg`/`ffprobe` backed transcoder.

use std::ffi::OsString;
use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use super::{MediaTranscoder, MuxPlan};
use crate::config::MediaConfig;
use crate::error::MediaError;
use crate::sanitize::redact_path;

/// Keep this much of a failing process's stderr.
const STDERR_TAIL_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub struct FfmpegTranscoder {
    ffmpeg: String,
    ffprobe: String,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegTranscoder {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    /// Arguments for the mux invocation.
    pub fn mux_args(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        plan: &MuxPlan,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), video.into()];
        if let Some(clip) = plan.clip_audio_to {
            args.push("-t".into());
            args.push(format!("{:.3}", clip).into());
        }
        let tail: [OsString; 11] = [
            "-i".into(),
            audio.into(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:v".into(),
            self.video_codec.clone().into(),
            "-c:a".into(),
            self.audio_codec.clone().into(),
            output.into(),
        ];
        args.extend(tail);
        args
    }
}

async fn run(program: &str, args: &[OsString]) -> Result<Output, MediaError> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| MediaError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(MediaError::ExitStatus {
            program: program.to_string(),
            code: output.status.code(),
            stderr: stderr_tail(&output.stderr),
        });
    }
    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}

/// Extracts the container duration from `ffprobe -of json` output.
pub fn parse_probe_duration(path: &Path, stdout: &[u8]) -> Result<f64, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout).map_err(|e| MediaError::Probe {
        path: path.to_path_buf(),
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let raw = probe
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| MediaError::Probe {
            path: path.to_path_buf(),
            reason: "no duration reported".to_string(),
        })?;

    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(MediaError::Probe {
            path: path.to_path_buf(),
            reason: format!("unparsable duration '{}'", raw),
        }),
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaError> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "json".into(),
            path.into(),
        ];
        let output = run(&self.ffprobe, &args).await?;
        let secs = parse_probe_duration(path, &output.stdout)?;
        debug!("Probed {}: {:.2}s", redact_path(path), secs);
        Ok(secs)
    }

    async fn mux(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
        plan: &MuxPlan,
    ) -> Result<(), MediaError> {
        for input in [video, audio] {
            if !input.exists() {
                return Err(MediaError::FileNotFound(input.to_path_buf()));
            }
        }

        debug!(
            "Muxing {} + {} -> {} (clip: {:?})",
            redact_path(video),
            redact_path(audio),
            redact_path(output),
            plan.clip_audio_to
        );
        run(&self.ffmpeg, &self.mux_args(video, audio, output, plan)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn transcoder() -> FfmpegTranscoder {
        FfmpegTranscoder::new(&MediaConfig::default())
    }

    fn to_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_mux_args_without_clip() {
        let args = transcoder().mux_args(
            Path::new("/w/in"),
            Path::new("/w/in_narration.mp3"),
            Path::new("/w/in_final.mp4"),
            &MuxPlan::new(10.0, 8.0),
        );
        assert_eq!(
            to_strings(args),
            vec![
                "-y", "-i", "/w/in", "-i", "/w/in_narration.mp3", "-map", "0:v:0", "-map",
                "1:a:0", "-c:v", "libx264", "-c:a", "aac", "/w/in_final.mp4",
            ]
        );
    }

    #[test]
    fn test_mux_args_clip_applies_to_audio_input() {
        let args = to_strings(transcoder().mux_args(
            Path::new("v"),
            Path::new("a"),
            Path::new("o"),
            &MuxPlan::new(12.5, 20.0),
        ));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "12.500");
        assert_eq!(args[t + 2], "-i");
        assert_eq!(args[t + 3], "a");
    }

    #[test]
    fn test_parse_probe_duration() {
        let path = PathBuf::from("clip.mp4");
        let secs =
            parse_probe_duration(&path, br#"{"format": {"duration": "31.466667"}}"#).unwrap();
        assert!((secs - 31.466667).abs() < 1e-9);
    }

    #[test]
    fn test_parse_probe_duration_errors() {
        let path = PathBuf::from("clip.mp4");
        assert!(matches!(
            parse_probe_duration(&path, b"{}"),
            Err(MediaError::Probe { .. })
        ));
        assert!(parse_probe_duration(&path, br#"{"format": {"duration": "N/A"}}"#).is_err());
        assert!(parse_probe_duration(&path, b"not json").is_err());
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = format!("{}END", "x".repeat(1000));
        let tail = stderr_tail(long.as_bytes());
        assert_eq!(tail.chars().count(), STDERR_TAIL_CHARS);
        assert!(tail.ends_with("END"));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = transcoder()
            .probe_duration(Path::new("/nonexistent/naturrate/clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_spawn_failure_names_program() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        std::fs::write(&video, b"v").unwrap();

        let config = MediaConfig {
            ffprobe_path: "/nonexistent/naturrate/ffprobe".to_string(),
            ..MediaConfig::default()
        };
        let err = FfmpegTranscoder::new(&config)
            .probe_duration(&video)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Spawn { .. }));
    }
}
