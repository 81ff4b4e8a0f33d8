//! Provider identities and the settings used to build their clients

use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4";

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";
pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// The closed set of upstream providers the relay knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::OpenAi, ProviderKind::Anthropic];

    /// Name used in replies and log lines
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }

    /// Environment variable holding the API key
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Cargo feature that compiles the client in
    pub fn feature(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Everything needed to build one provider client
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Output bound, for providers whose API requires one
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field(
                "api_key",
                &self.api_key.as_deref().map(crate::mask_secret),
            )
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Settings for both providers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai: ProviderConfig {
                api_key: None,
                base_url: OPENAI_BASE_URL.to_string(),
                model: OPENAI_MODEL.to_string(),
                max_tokens: None,
            },
            anthropic: ProviderConfig {
                api_key: None,
                base_url: ANTHROPIC_BASE_URL.to_string(),
                model: ANTHROPIC_MODEL.to_string(),
                max_tokens: Some(ANTHROPIC_MAX_TOKENS),
            },
        }
    }
}

impl ProviderSettings {
    pub fn get(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    pub fn get_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Anthropic => &mut self.anthropic,
        }
    }

    /// Fill in API keys by looking up each provider's variable once.
    ///
    /// Empty values count as unset.
    pub fn with_keys_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for kind in ProviderKind::ALL {
            self.get_mut(kind).api_key = lookup(kind.env_var()).filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// Fill in API keys from the process environment
    pub fn with_keys_from_env(self) -> Self {
        self.with_keys_from(|name| std::env::var(name).ok())
    }
}
