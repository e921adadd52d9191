//! Shared HTTP plumbing for the vendor clients.

use std::path::Path;
use std::time::Duration;

use reqwest::{Body, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;

use crate::error::ServiceError;
use crate::sanitize::truncate_body;

/// Connect timeout for vendor requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-request timeout for video uploads, replacing the client default.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Creates an HTTP client with connect and request timeouts.
pub fn build_client(request_timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ServiceError::ClientBuild(e.to_string()))
}

/// Opens `path` as a streaming request body. Returns the body and the file
/// length.
pub async fn file_body(path: &Path) -> std::io::Result<(Body, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    Ok((Body::wrap_stream(ReaderStream::new(file)), len))
}

/// Sends a request and turns transport failures and non-2xx responses into
/// [`ServiceError`]s. Error bodies are truncated before they are kept.
pub async fn send(service: &'static str, request: RequestBuilder) -> Result<Response, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        service,
        status: status.as_u16(),
        body: truncate_body(&body),
    })
}

/// Reads a JSON response body.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, ServiceError> {
    let text = response
        .text()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;
    parse_json(service, &text)
}

pub fn parse_json<T: DeserializeOwned>(service: &'static str, text: &str) -> Result<T, ServiceError> {
    serde_json::from_str(text).map_err(|e| ServiceError::Decode {
        service,
        message: e.to_string(),
    })
}

/// Joins a base URL and a path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
