//! Wire types for the relay's HTTP surface

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker every soft-failure reply starts with
pub const WARNING: &str = "⚠️";

/// Front-end model labels
pub mod models {
    pub const OPENAI_GPT4: &str = "OpenAI GPT-4";
    pub const CLAUDE_3_SONNET: &str = "Claude 3 Sonnet";
}

/// Successful (HTTP 200) response body, including soft failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }

    /// A soft failure: `⚠️ <text>`
    pub fn warning(text: impl AsRef<str>) -> Self {
        Self {
            reply: format!("{} {}", WARNING, text.as_ref()),
        }
    }
}

/// Body of the one transport-level error (HTTP 400)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Fields of a chat request, read permissively from any JSON value.
///
/// Non-object bodies have no fields. Non-string values are kept as their
/// JSON text. A `message` that is empty (`""`, `0`, `false`, `[]`, `{}`)
/// counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub message: Option<String>,
}

impl ChatRequest {
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.as_object().and_then(|o| o.get(name));

        Self {
            model: field("model").filter(|v| !v.is_null()).map(render),
            message: field("message").filter(|v| !is_empty(v)).map(render),
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The model a request selected, matched exactly against the known labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    OpenAiGpt4,
    Claude3Sonnet,
    /// Anything else; holds the label as it should be echoed back
    Unknown(String),
}

impl ModelChoice {
    pub fn parse(model: Option<&str>) -> Self {
        match model {
            Some(models::OPENAI_GPT4) => Self::OpenAiGpt4,
            Some(models::CLAUDE_3_SONNET) => Self::Claude3Sonnet,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown("None".to_string()),
        }
    }
}
