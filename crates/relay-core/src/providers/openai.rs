//! OpenAI provider (Chat Completions API)

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ProviderError, Result};

use super::types::{ChatMessage, ChatProvider};

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    authorization: HeaderValue,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: String, base_url: String) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| {
                ProviderError::InvalidCredential(
                    "key contains characters that are not allowed in an HTTP header".to_string(),
                )
            })?;
        authorization.set_sensitive(true);

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            authorization,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    /// Pull the first choice's text out of a completion
    fn first_text(resp: OpenAiApiResponse) -> Result<String> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("OpenAI response had no choices".to_string()))?;

        choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("OpenAI choice had no message content".to_string())
            })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, message: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let messages = [ChatMessage::user(message)];
        let body = OpenAiRequest {
            model: &self.model,
            messages: &messages,
        };

        debug!("OpenAI request: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.authorization.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::from_status(status, &error_text));
        }

        let api_response: OpenAiApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        debug!(
            "OpenAI response: choices={}, finish_reason={:?}",
            api_response.choices.len(),
            api_response.choices.first().map(|c| &c.finish_reason)
        );

        Self::first_text(api_response)
    }
}

// ── OpenAI wire types ──

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiApiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}
