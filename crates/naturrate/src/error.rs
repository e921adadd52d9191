use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NaturrateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("External service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Failed to write upload '{path}': {source}")]
    WriteUpload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Shutting down, not accepting new uploads")]
    ShuttingDown,
}

/// Why a finished video could not be handed out.
#[derive(Error, Debug)]
pub enum ResultError {
    #[error("Video not found")]
    NotFound,

    #[error("Video processing not completed")]
    NotReady,

    #[error("{0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid bind address '{value}': {reason}")]
    InvalidBind { value: String, reason: String },
}

/// A call to one of the external AI vendors failed.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an empty response")]
    EmptyResponse { service: &'static str },

    #[error("Failed to read '{path}' for {service}: {source}")]
    Io {
        service: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {code:?}: {stderr}")]
    ExitStatus {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not determine duration of '{path}': {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Media file not found: {0}")]
    FileNotFound(PathBuf),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },

    #[error("Failed to sign URL for '{key}': {message}")]
    Sign { key: String, message: String },

    #[error("Failed to obtain storage access token: {0}")]
    Token(String),
}

pub type Result<T> = std::result::Result<T, NaturrateError>;
