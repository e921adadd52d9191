use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretRef;

/// Top-level service configuration. Every field has a default so an empty
/// JSON object is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub pipeline: PipelineSettings,
    pub status: StatusConfig,
    pub services: ServicesConfig,
    pub twelvelabs: TwelveLabsConfig,
    pub openai: OpenAiConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub media: MediaConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Externally reachable base URL, used for local artifact links.
    pub public_base_url: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            max_upload_mb: 512,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Directory for transient uploads, narration audio and muxed output.
    pub work_dir: PathBuf,
    /// Overall per-job deadline. `None` disables it.
    pub timeout_secs: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusConfig {
    /// Cadence at which the status stream re-reads job state.
    pub poll_interval_ms: u64,
    /// How long a status stream waits for an unknown job to appear.
    pub not_found_grace_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            not_found_grace_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Real vendor APIs, ffmpeg and the configured blob store.
    #[default]
    Live,
    /// In-process stand-ins for every collaborator; no credentials needed.
    Stub,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicesConfig {
    pub mode: ServiceMode,
    pub request_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            mode: ServiceMode::Live,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TwelveLabsConfig {
    pub api_key: SecretRef,
    pub base_url: String,
    pub index_id: String,
    pub poll_interval_secs: u64,
    pub indexing_timeout_secs: u64,
}

impl Default for TwelveLabsConfig {
    fn default() -> Self {
        Self {
            api_key: SecretRef::env("TWELVE_LABS_API_KEY"),
            base_url: "https://api.twelvelabs.io/v1.3".to_string(),
            index_id: "66b90051ab9e0130df471775".to_string(),
            poll_interval_secs: 5,
            indexing_timeout_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiConfig {
    pub api_key: SecretRef,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    /// User prompt; `{chapters}` is replaced with the chapter document.
    pub prompt_template: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: SecretRef::env("OPENAI_API_KEY"),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            system_prompt: "You are a skilled nature documentary narrator.".to_string(),
            prompt_template: "Write a concise narration script for a short nature video. \
                Output only the narration text, without timestamps or headers, paced at \
                about 2-3 words per second to fit each chapter's duration.\n\n{chapters}"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElevenLabsConfig {
    pub api_key: SecretRef,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: SecretRef::env("ELEVEN_LABS_API_KEY"),
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            voice_id: "pvb9AjTFewcRSOPkd8pt".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Gcs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub signed_url_ttl_secs: u64,
    pub local: LocalStorageConfig,
    pub gcs: GcsConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            signed_url_ttl_secs: 3600,
            local: LocalStorageConfig::default(),
            gcs: GcsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalStorageConfig {
    pub root: PathBuf,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GcsConfig {
    pub bucket: String,
    /// Service account whose key signs download URLs (via IAM signBlob).
    pub service_account_email: String,
    /// Static OAuth access token; when unset the GCE metadata server is used.
    pub access_token: SecretRef,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            bucket: "naturrate_data_bucket".to_string(),
            service_account_email: String::new(),
            access_token: SecretRef::env("GCS_ACCESS_TOKEN"),
        }
    }
}
