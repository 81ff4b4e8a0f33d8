//! Error types shared by the provider clients

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Everything that can go wrong while building or calling a provider client
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The API key cannot be sent as an HTTP header value
    #[error("invalid API key: {0}")]
    InvalidCredential(String),

    /// The underlying HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Upstream rejected the credential (HTTP 401)
    #[error("Error code: {status} - {message}")]
    Authentication { status: u16, message: String },

    /// Upstream answered with any other non-success status
    #[error("Error code: {status} - {message}")]
    Api { status: u16, message: String },

    /// The request never produced an HTTP response
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered 2xx but the body was not usable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Build the error for a non-success upstream status.
    ///
    /// Both providers wrap failures as `{"error": {"message": ...}}`; when the
    /// body has some other shape the raw text is kept.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });

        if status == StatusCode::UNAUTHORIZED {
            Self::Authentication {
                status: status.as_u16(),
                message,
            }
        } else {
            Self::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// Whether the upstream said the credential is bad
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Whether this came back from the provider API itself
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Api { .. })
    }

    /// Whether the request failed before any response (connect, timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Short variant name for server-side diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential(_) => "InvalidCredential",
            Self::Client(_) => "Client",
            Self::Authentication { .. } => "AuthenticationError",
            Self::Api { .. } => "APIError",
            Self::Transport(_) => "TransportError",
            Self::InvalidResponse(_) => "InvalidResponse",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}
