//! Blob stores for finished artifacts.

pub mod gcs;
pub mod local;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{Config, ServiceMode, StorageBackend};
use crate::error::{NaturrateError, StorageError};

pub use gcs::GcsBlobStore;
pub use local::LocalBlobStore;

/// Object storage holding final videos and issuing time-limited download URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads the file at `path` under `key`, replacing any existing object.
    async fn put(&self, key: &str, path: &Path) -> Result<(), StorageError>;

    /// Mints a fresh download URL for `key`, valid for `ttl`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// The configured blob store. `local` is set when artifacts are served by
/// this process through `/artifacts/{token}`.
#[derive(Clone)]
pub struct BlobStoreHandle {
    pub store: Arc<dyn BlobStore>,
    pub local: Option<Arc<LocalBlobStore>>,
}

impl BlobStoreHandle {
    pub fn local(store: LocalBlobStore) -> Self {
        let local = Arc::new(store);
        Self {
            store: Arc::clone(&local) as Arc<dyn BlobStore>,
            local: Some(local),
        }
    }
}

/// Builds the blob store selected by `storage.backend`. Stub mode always
/// stores locally.
pub fn from_config(config: &Config) -> Result<BlobStoreHandle, NaturrateError> {
    let backend = match config.services.mode {
        ServiceMode::Stub => StorageBackend::Local,
        ServiceMode::Live => config.storage.backend,
    };

    match backend {
        StorageBackend::Local => Ok(BlobStoreHandle::local(LocalBlobStore::new(
            &config.storage.local.root,
            &config.server.public_base_url,
        ))),
        StorageBackend::Gcs => {
            let token = config
                .storage
                .gcs
                .access_token
                .resolve_optional("GCS access token")
                .or_else(|e| match e {
                    // An unset token variable means: use the metadata server
                    crate::secrets::SecretError::EnvVarNotSet { .. } => Ok(None),
                    other => Err(other),
                })?;
            let store = GcsBlobStore::new(
                &config.storage.gcs,
                token,
                Duration::from_secs(config.services.request_timeout_secs),
            )?;
            Ok(BlobStoreHandle {
                store: Arc::new(store),
                local: None,
            })
        }
    }
}

/// Blob key of a job's final video.
pub fn artifact_key(job_id: &str) -> String {
    format!("{}.mp4", job_id)
}

/// Keys are flat names: `[A-Za-z0-9._-]`, no leading dot.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
