//! OpenAI chat-completions narration generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::http::{build_client, endpoint, read_json, send};
use super::NarrationGenerator;
use crate::config::OpenAiConfig;
use crate::error::ServiceError;

const SERVICE: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiNarrator {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    system_prompt: String,
    prompt_template: String,
}

impl OpenAiNarrator {
    pub fn new(
        config: &OpenAiConfig,
        api_key: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(request_timeout)?,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            prompt_template: config.prompt_template.clone(),
        })
    }

    fn user_prompt(&self, chapters_text: &str) -> String {
        render_prompt(&self.prompt_template, chapters_text)
    }
}

/// Substitutes the chapter document into a prompt template.
pub fn render_prompt(template: &str, chapters_text: &str) -> String {
    template.replace("{chapters}", chapters_text)
}

fn first_content(response: ChatResponse) -> Result<String, ServiceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(ServiceError::EmptyResponse { service: SERVICE })
}

#[async_trait]
impl NarrationGenerator for OpenAiNarrator {
    async fn generate(&self, chapters_text: &str) -> Result<String, ServiceError> {
        let user_prompt = self.user_prompt(chapters_text);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &self.system_prompt,
                },
                Message {
                    role: "user",
                    content: &user_prompt,
                },
            ],
        };

        let request = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body);

        let response: ChatResponse = read_json(SERVICE, send(SERVICE, request).await?).await?;
        first_content(response)
    }
}
