//! Anthropic Claude provider (Messages API)

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ProviderError, Result};

use super::types::{ChatMessage, ChatProvider};

const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: HeaderValue,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicProvider {
    /// Build a client bound to `api_key`.
    ///
    /// Fails if the key cannot travel as a header or the HTTP client cannot
    /// be constructed. No request is sent.
    pub fn new(api_key: &str, model: String, base_url: String, max_tokens: u32) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(api_key.trim()).map_err(|_| {
            ProviderError::InvalidCredential(
                "key contains characters that are not allowed in an HTTP header".to_string(),
            )
        })?;
        api_key.set_sensitive(true);

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_tokens,
        })
    }

    /// Pull the first content block's text out of a response
    fn first_text(resp: AnthropicApiResponse) -> Result<String> {
        match resp.content.into_iter().next() {
            Some(AnthropicBlock::Text { text }) => Ok(text.trim().to_string()),
            Some(AnthropicBlock::Other) => Err(ProviderError::InvalidResponse(
                "Anthropic response did not start with a text block".to_string(),
            )),
            None => Err(ProviderError::InvalidResponse(
                "Anthropic response had no content".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, message: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let messages = [ChatMessage::user(message)];
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: &messages,
        };

        debug!(
            "Anthropic request: model={}, max_tokens={}",
            self.model, self.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", API_VERSION)
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

        let api_response: AnthropicApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        debug!(
            "Anthropic response: id={}, blocks={}, stop_reason={:?}",
            api_response.id,
            api_response.content.len(),
            api_response.stop_reason
        );

        Self::first_text(api_response)
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicApiResponse {
    #[serde(default)]
    id: String,
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
}
