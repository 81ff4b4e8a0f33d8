//! `POST /chat` - validate, pick a provider, make one upstream call
//!
//! Only a body that is not JSON produces an HTTP error. Every other outcome,
//! including provider failures, is a 200 with a `reply` string.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_core::{ProviderError, ProviderHandles, ProviderKind};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::protocol::{ChatReply, ChatRequest, ErrorDetail, ModelChoice};
use crate::server::RelayState;

pub async fn chat_handler(State(state): State<RelayState>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Rejecting chat request with invalid JSON: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorDetail {
                    detail: format!("Invalid JSON payload: {}", e),
                }),
            )
                .into_response();
        }
    };

    let request = ChatRequest::from_value(&value);
    Json(relay(&state.providers, &request).await).into_response()
}

/// Turn one chat request into a reply. Never fails.
pub async fn relay(providers: &ProviderHandles, request: &ChatRequest) -> ChatReply {
    let Some(message) = request.message.as_deref() else {
        return ChatReply::warning("Please provide a message.");
    };

    let kind = match ModelChoice::parse(request.model.as_deref()) {
        ModelChoice::OpenAiGpt4 => ProviderKind::OpenAi,
        ModelChoice::Claude3Sonnet => ProviderKind::Anthropic,
        ModelChoice::Unknown(label) => {
            debug!("Chat request for unknown model {:?}", label);
            return ChatReply::warning(format!("Invalid model selected: {}", label));
        }
    };

    let Some(provider) = providers.get(kind) else {
        warn!("Chat request for {} but its client is not configured", kind);
        return not_configured(kind);
    };

    info!(
        "Relaying chat to {} (model={}, chars={})",
        kind,
        provider.model(),
        message.chars().count()
    );

    match provider.complete(message).await {
        Ok(text) => ChatReply::new(text),
        Err(e) => {
            error!("Chat error ({} {}): {}", kind, e.kind(), e);
            ErrorClass::of(&e).reply(kind, &e)
        }
    }
}

fn not_configured(kind: ProviderKind) -> ChatReply {
    match kind {
        ProviderKind::OpenAi => ChatReply::warning(
            "OpenAI client is not configured on the server. Check server startup logs for API key issues.",
        ),
        ProviderKind::Anthropic => ChatReply::warning(
            "Anthropic client is not configured on the server. Check server startup logs for API key issues (ANTHROPIC_API_KEY).",
        ),
    }
}

/// How a provider failure is reported, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected credential, or any message mentioning authentication
    Authentication,
    /// Some other error from the provider API, or no response at all
    Api,
    /// Unusable responses, anything else
    Unexpected,
}

impl ErrorClass {
    pub fn of(err: &ProviderError) -> Self {
        if err.is_authentication() || err.to_string().to_lowercase().contains("authentication") {
            Self::Authentication
        } else if err.is_api() || err.is_transport() {
            Self::Api
        } else {
            Self::Unexpected
        }
    }

    pub fn reply(self, kind: ProviderKind, err: &ProviderError) -> ChatReply {
        match self {
            Self::Authentication => ChatReply::warning(format!(
                "{} Authentication Error: {}. Please URGENTLY double-check your {} in the .env file AND ensure the server was RESTARTED after any changes.",
                kind,
                err,
                kind.env_var()
            )),
            Self::Api => ChatReply::warning(format!("{} API Error: {}", kind, err)),
            Self::Unexpected => ChatReply::warning(format!(
                "An unexpected error occurred on the server: {}",
                err
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_error() -> ProviderError {
        ProviderError::Authentication {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }
    }

    #[test]
    fn test_classify_authentication_status() {
        assert_eq!(ErrorClass::of(&auth_error()), ErrorClass::Authentication);
    }

    #[test]
    fn test_classify_authentication_by_message() {
        let err = ProviderError::Api {
            status: 400,
            message: "Could not resolve Authentication method".to_string(),
        };
        assert_eq!(ErrorClass::of(&err), ErrorClass::Authentication);

        let err = ProviderError::InvalidResponse("authentication header missing".to_string());
        assert_eq!(ErrorClass::of(&err), ErrorClass::Authentication);
    }

    #[test]
    fn test_classify_api_and_unexpected() {
        let err = ProviderError::Api {
            status: 529,
            message: "Overloaded".to_string(),
        };
        assert_eq!(ErrorClass::of(&err), ErrorClass::Api);
        assert_eq!(
            ErrorClass::of(&ProviderError::InvalidResponse("no choices".to_string())),
            ErrorClass::Unexpected
        );
    }

    #[test]
    fn test_authentication_reply_names_env_var() {
        let reply = ErrorClass::Authentication.reply(ProviderKind::Anthropic, &auth_error());
        assert_eq!(
            reply.reply,
            "⚠️ Anthropic Authentication Error: Error code: 401 - invalid x-api-key. \
             Please URGENTLY double-check your ANTHROPIC_API_KEY in the .env file AND ensure \
             the server was RESTARTED after any changes."
        );

        let reply = ErrorClass::Authentication.reply(ProviderKind::OpenAi, &auth_error());
        assert!(reply.reply.starts_with("⚠️ OpenAI Authentication Error: "));
        assert!(reply.reply.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_api_and_unexpected_replies() {
        let err = ProviderError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(
            ErrorClass::Api.reply(ProviderKind::OpenAi, &err).reply,
            "⚠️ OpenAI API Error: Error code: 500 - boom"
        );
        let err = ProviderError::InvalidResponse("no choices".to_string());
        assert_eq!(
            ErrorClass::Unexpected.reply(ProviderKind::OpenAi, &err).reply,
            "⚠️ An unexpected error occurred on the server: invalid response: no choices"
        );
    }

    #[tokio::test]
    async fn test_relay_missing_message() {
        let providers = ProviderHandles::default();
        for model in [None, Some("OpenAI GPT-4"), Some("bogus")] {
            let req = ChatRequest {
                model: model.map(str::to_string),
                message: None,
            };
            assert_eq!(
                relay(&providers, &req).await.reply,
                "⚠️ Please provide a message."
            );
        }
    }

    #[tokio::test]
    async fn test_relay_unconfigured_providers() {
        let providers = ProviderHandles::default();
        let req = ChatRequest {
            model: Some("OpenAI GPT-4".to_string()),
            message: Some("hello".to_string()),
        };
        assert_eq!(
            relay(&providers, &req).await.reply,
            "⚠️ OpenAI client is not configured on the server. Check server startup logs for API key issues."
        );

        let req = ChatRequest {
            model: Some("Claude 3 Sonnet".to_string()),
            message: Some("hello".to_string()),
        };
        assert_eq!(
            relay(&providers, &req).await.reply,
            "⚠️ Anthropic client is not configured on the server. Check server startup logs for API key issues (ANTHROPIC_API_KEY)."
        );
    }
}
