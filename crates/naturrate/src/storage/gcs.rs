//! Google Cloud Storage blob store.
//!
//! Objects are uploaded through the JSON media-upload endpoint. Download
//! URLs are V4 signed URLs; the signature is produced by the IAM
//! Credentials `signBlob` API for the configured service account, so no
//! private key ever touches this process.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::debug;
use moka::sync::Cache;
use moka::Expiry;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{validate_key, BlobStore};
use crate::config::GcsConfig;
use crate::error::StorageError;
use crate::sanitize::truncate_body;
use crate::services::http::{build_client, file_body, UPLOAD_TIMEOUT};

const STORAGE_HOST: &str = "storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const SIGNING_ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// Refresh metadata-server tokens this long before they expire.
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

const TOKEN_CACHE_KEY: &str = "access_token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct SignBlobRequest {
    payload: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignBlobResponse {
    signed_blob: String,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    ttl: Duration,
}

struct CachedTokenExpiry;

impl Expiry<&'static str, CachedToken> for CachedTokenExpiry {
    fn expire_after_create(
        &self,
        _key: &&'static str,
        value: &CachedToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

enum TokenSource {
    Static(SecretString),
    /// GCE metadata server, cached until shortly before expiry.
    Metadata(Cache<&'static str, CachedToken>),
}

pub struct GcsBlobStore {
    client: Client,
    bucket: String,
    service_account_email: String,
    tokens: TokenSource,
}

impl GcsBlobStore {
    /// `access_token` of `None` means tokens come from the metadata server.
    pub fn new(
        config: &GcsConfig,
        access_token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client =
            build_client(request_timeout).map_err(|e| StorageError::Token(e.to_string()))?;
        let tokens = match access_token {
            Some(token) => TokenSource::Static(token),
            None => TokenSource::Metadata(
                Cache::builder()
                    .max_capacity(1)
                    .expire_after(CachedTokenExpiry)
                    .build(),
            ),
        };
        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            service_account_email: config.service_account_email.clone(),
            tokens,
        })
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        match &self.tokens {
            TokenSource::Static(token) => Ok(token.expose_secret().to_string()),
            TokenSource::Metadata(cache) => {
                if let Some(cached) = cache.get(TOKEN_CACHE_KEY) {
                    return Ok(cached.token);
                }
                let fetched = self.fetch_metadata_token().await?;
                let ttl = fetched.expires_in.saturating_sub(TOKEN_REFRESH_MARGIN_SECS);
                if ttl > 0 {
                    cache.insert(
                        TOKEN_CACHE_KEY,
                        CachedToken {
                            token: fetched.access_token.clone(),
                            ttl: Duration::from_secs(ttl),
                        },
                    );
                }
                Ok(fetched.access_token)
            }
        }
    }

    async fn fetch_metadata_token(&self) -> Result<MetadataToken, StorageError> {
        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StorageError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Token(format!(
                "metadata server returned {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| StorageError::Token(e.to_string()))?;
        debug!("Fetched metadata token valid for {}s", token.expires_in);
        Ok(token)
    }

    async fn sign(&self, key: &str, string_to_sign: &str) -> Result<String, StorageError> {
        let token = self.access_token().await?;
        let url = format!(
            "https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/{}:signBlob",
            self.service_account_email
        );
        let request = SignBlobRequest {
            payload: base64::engine::general_purpose::STANDARD.encode(string_to_sign),
        };

        let sign_error = |message: String| StorageError::Sign {
            key: key.to_string(),
            message,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| sign_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(sign_error(format!(
                "signBlob returned {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let signed: SignBlobResponse = response
            .json()
            .await
            .map_err(|e| sign_error(e.to_string()))?;
        let signature = base64::engine::general_purpose::STANDARD
            .decode(signed.signed_blob)
            .map_err(|e| sign_error(format!("invalid signature encoding: {}", e)))?;

        Ok(hex::encode(signature))
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        validate_key(key)?;
        let (body, len) = file_body(path)
            .await
            .map_err(|source| StorageError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let token = self.access_token().await?;

        let url = format!(
            "https://{}/upload/storage/v1/b/{}/o",
            STORAGE_HOST, self.bucket
        );
        let upload_error = |message: String| StorageError::Upload {
            key: key.to_string(),
            message,
        };

        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .header(reqwest::header::CONTENT_LENGTH, len)
            .timeout(UPLOAD_TIMEOUT)
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("{}: {}", status, truncate_body(&body))));
        }

        debug!("Uploaded gs://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        validate_key(key)?;
        let request = V4SignRequest::new(
            &self.bucket,
            key,
            &self.service_account_email,
            Utc::now(),
            ttl,
        );
        let signature = self.sign(key, &request.string_to_sign()).await?;
        Ok(request.url(&signature))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let token = self.access_token().await?;
        let url = format!(
            "https://{}/storage/v1/b/{}/o/{}",
            STORAGE_HOST,
            self.bucket,
            uri_encode(key, true)
        );

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::ReadFile {
                path: key.into(),
                source: std::io::Error::other(e.to_string()),
            })?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(StorageError::ReadFile {
                path: key.into(),
                source: std::io::Error::other(format!("object lookup returned {}", other)),
            }),
        }
    }
}

/// The pieces of a V4 signed GET URL that do not depend on the signature.
#[derive(Debug, Clone)]
pub struct V4SignRequest {
    bucket: String,
    key: String,
    credential_scope: String,
    timestamp: String,
    canonical_query: String,
}

impl V4SignRequest {
    pub fn new(
        bucket: &str,
        key: &str,
        service_account_email: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let date = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential_scope = format!("{}/auto/storage/goog4_request", date);
        let credential = format!("{}/{}", service_account_email, credential_scope);

        // Already in sorted order
        let params = [
            ("X-Goog-Algorithm", SIGNING_ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", ttl.as_secs().to_string()),
            ("X-Goog-SignedHeaders", "host".to_string()),
        ];
        let canonical_query = params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            credential_scope,
            timestamp,
            canonical_query,
        }
    }

    fn resource(&self) -> String {
        format!("/{}/{}", self.bucket, uri_encode(&self.key, false))
    }

    pub fn canonical_request(&self) -> String {
        format!(
            "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            self.resource(),
            self.canonical_query,
            STORAGE_HOST
        )
    }

    pub fn string_to_sign(&self) -> String {
        let digest = Sha256::digest(self.canonical_request().as_bytes());
        format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            self.timestamp,
            self.credential_scope,
            hex::encode(digest)
        )
    }

    pub fn url(&self, signature_hex: &str) -> String {
        format!(
            "https://{}{}?{}&X-Goog-Signature={}",
            STORAGE_HOST,
            self.resource(),
            self.canonical_query,
            signature_hex
        )
    }
}

/// RFC 3986 percent-encoding as required by V4 signing.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
