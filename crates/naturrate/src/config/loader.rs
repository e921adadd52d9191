use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::{Config, ServiceMode, StorageBackend};
use crate::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV_VAR: &str = "NATURRATE_CONFIG";

/// Environment variable overriding `server.bind`.
pub const BIND_ENV_VAR: &str = "NATURRATE_BIND";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "naturrate.json";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads configuration the way the server does at startup: the file named by
/// `NATURRATE_CONFIG`, else `naturrate.json` if it exists, else defaults;
/// then environment overrides.
pub fn load_from_env() -> Result<Config, ConfigError> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV_VAR).map(PathBuf::from);
    let mut config = match explicit {
        Some(path) => load_config(&path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_config(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };

    if let Ok(bind) = std::env::var(BIND_ENV_VAR) {
        if !bind.trim().is_empty() {
            config.server.bind = bind.trim().to_string();
        }
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config
        .server
        .bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidBind {
            value: config.server.bind.clone(),
            reason: e.to_string(),
        })?;

    if config.server.max_upload_mb == 0 {
        return Err(validation("server.maxUploadMb must be greater than 0"));
    }

    if config.status.poll_interval_ms == 0 {
        return Err(validation("status.pollIntervalMs must be greater than 0"));
    }

    if config.twelvelabs.poll_interval_secs == 0 {
        return Err(validation("twelvelabs.pollIntervalSecs must be greater than 0"));
    }

    if config.storage.signed_url_ttl_secs == 0 {
        return Err(validation("storage.signedUrlTtlSecs must be greater than 0"));
    }

    // GCS V4 signed URLs are capped at 7 days
    if config.storage.signed_url_ttl_secs > 604_800 {
        return Err(validation("storage.signedUrlTtlSecs must be at most 604800"));
    }

    if config.pipeline.timeout_secs == Some(0) {
        return Err(validation("pipeline.timeoutSecs must be greater than 0 when set"));
    }

    if !config.openai.prompt_template.contains("{chapters}") {
        return Err(validation(
            "openai.promptTemplate must contain the {chapters} placeholder",
        ));
    }

    if config.services.mode == ServiceMode::Live {
        if config.twelvelabs.index_id.trim().is_empty() {
            return Err(validation("twelvelabs.indexId is required"));
        }
        if config.elevenlabs.voice_id.trim().is_empty() {
            return Err(validation("elevenlabs.voiceId is required"));
        }
        if config.storage.backend == StorageBackend::Gcs {
            if config.storage.gcs.bucket.trim().is_empty() {
                return Err(validation("storage.gcs.bucket is required"));
            }
            if config.storage.gcs.service_account_email.trim().is_empty() {
                return Err(validation("storage.gcs.serviceAccountEmail is required"));
            }
        }
    }

    Ok(())
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage.signed_url_ttl_secs, 3600);
        assert_eq!(config.status.poll_interval_ms, 1000);
        assert_eq!(config.twelvelabs.poll_interval_secs, 5);
        assert_eq!(config.elevenlabs.voice_id, "pvb9AjTFewcRSOPkd8pt");
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = load_config_from_str(
            r#"{
                "server": { "bind": "127.0.0.1:9000" },
                "logging": { "format": "json" },
                "services": { "mode": "stub" },
                "openai": { "model": "gpt-4o" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.max_upload_mb, 512);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.services.mode, ServiceMode::Stub);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = load_config_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let err = load_config_from_str(r#"{"server": {"bind": "localhost"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBind { .. }));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let err = load_config_from_str(r#"{"status": {"pollIntervalMs": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("pollIntervalMs"));

        let err =
            load_config_from_str(r#"{"twelvelabs": {"pollIntervalSecs": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("pollIntervalSecs"));
    }

    #[test]
    fn test_prompt_template_requires_placeholder() {
        let err =
            load_config_from_str(r#"{"openai": {"promptTemplate": "narrate"}}"#).unwrap_err();
        assert!(err.to_string().contains("{chapters}"));
    }

    #[test]
    fn test_gcs_requires_service_account_in_live_mode() {
        let err = load_config_from_str(r#"{"storage": {"backend": "gcs"}}"#).unwrap_err();
        assert!(err.to_string().contains("serviceAccountEmail"));

        let ok = load_config_from_str(
            r#"{"services": {"mode": "stub"}, "storage": {"backend": "gcs"}}"#,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_signed_url_ttl_bounds() {
        assert!(load_config_from_str(r#"{"storage": {"signedUrlTtlSecs": 0}}"#).is_err());
        assert!(load_config_from_str(r#"{"storage": {"signedUrlTtlSecs": 700000}}"#).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/naturrate.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    #[serial]
    fn test_load_from_env_uses_file_and_bind_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"bind": "127.0.0.1:7000"}}}}"#).unwrap();

        std::env::set_var(CONFIG_PATH_ENV_VAR, file.path());
        std::env::set_var(BIND_ENV_VAR, "127.0.0.1:7001");

        let config = load_from_env().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7001");

        std::env::remove_var(BIND_ENV_VAR);
        let config = load_from_env().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:7000");

        std::env::remove_var(CONFIG_PATH_ENV_VAR);
    }
}
