pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_from_env, validate_config};
pub use schema::{
    Config, ElevenLabsConfig, GcsConfig, LocalStorageConfig, LogFormat, LoggingConfig,
    MediaConfig, OpenAiConfig, PipelineSettings, ServerConfig, ServiceMode, ServicesConfig,
    StatusConfig, StorageBackend, StorageConfig, TwelveLabsConfig,
};
