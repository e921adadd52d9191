//! ElevenLabs text-to-speech client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::http::{build_client, endpoint, send};
use super::SpeechSynthesizer;
use crate::config::ElevenLabsConfig;
use crate::error::ServiceError;

const SERVICE: &str = "elevenlabs";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

pub struct ElevenLabsSynthesizer {
    client: Client,
    base_url: String,
    api_key: SecretString,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        config: &ElevenLabsConfig,
        api_key: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(request_timeout)?,
            base_url: config.base_url.clone(),
            api_key,
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ServiceError> {
        let request = self
            .client
            .post(endpoint(
                &self.base_url,
                &format!("text-to-speech/{}", self.voice_id),
            ))
            .header("xi-api-key", self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            });

        let audio = send(SERVICE, request)
            .await?
            .bytes()
            .await
            .map_err(|source| ServiceError::Http {
                service: SERVICE,
                source,
            })?;

        if audio.is_empty() {
            return Err(ServiceError::EmptyResponse { service: SERVICE });
        }
        Ok(audio.to_vec())
    }
}
