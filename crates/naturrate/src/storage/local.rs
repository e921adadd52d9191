//! Blob store on the local filesystem with expiring token URLs.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::debug;
use moka::sync::Cache;
use moka::Expiry;

use super::{validate_key, BlobStore};
use crate::error::StorageError;

/// Upper bound on outstanding download tokens.
const MAX_TOKENS: u64 = 10_000;

#[derive(Clone)]
struct TokenEntry {
    key: String,
    ttl: Duration,
}

struct TokenExpiry;

impl Expiry<String, TokenEntry> for TokenExpiry {
    fn expire_after_create(
        &self,
        _token: &String,
        entry: &TokenEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Stores artifacts under a root directory. Download URLs point at the
/// server's `/artifacts/{token}` route; tokens expire after their TTL.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    tokens: Cache<String, TokenEntry>,
}

impl LocalBlobStore {
    pub fn new<P: AsRef<Path>>(root: P, public_base_url: &str) -> Self {
        let tokens = Cache::builder()
            .max_capacity(MAX_TOKENS)
            .expire_after(TokenExpiry)
            .build();
        Self {
            root: root.as_ref().to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored object.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Maps a download token to its artifact while the token is valid and
    /// the artifact exists.
    pub fn resolve(&self, token: &str) -> Option<PathBuf> {
        let entry = self.tokens.get(token)?;
        let path = self.root.join(&entry.key);
        path.is_file().then_some(path)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        let target = self.object_path(key)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::CreateDirectory {
                path: self.root.clone(),
                source,
            })?;

        tokio::fs::copy(path, &target)
            .await
            .map_err(|source| StorageError::CopyFile {
                from: path.to_path_buf(),
                to: target.clone(),
                source,
            })?;

        debug!("Stored artifact {}", key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens.insert(
            token.clone(),
            TokenEntry {
                key: key.to_string(),
                ttl,
            },
        );
        Ok(format!("{}/artifacts/{}", self.public_base_url, token))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }
}
