use anyhow::{Context, Result};
use relay_core::settings::{
    ANTHROPIC_BASE_URL, ANTHROPIC_MAX_TOKENS, ANTHROPIC_MODEL, OPENAI_BASE_URL, OPENAI_MODEL,
};
use relay_core::{ProviderConfig, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Optional on-disk config. API keys never live here; they come from the
/// environment (or `.env`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base_url() -> String {
    OPENAI_BASE_URL.to_string()
}
fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
}

fn default_anthropic_base_url() -> String {
    ANTHROPIC_BASE_URL.to_string()
}
fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}
fn default_anthropic_max_tokens() -> u32 {
    ANTHROPIC_MAX_TOKENS
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".duorelay")
}

impl RelayConfig {
    /// Load the config. An explicit path must exist; the default path is
    /// optional and falls back to built-in defaults.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from(path, true),
            None => Self::load_from(&config_dir().join("config.toml"), false),
        }
    }

    fn load_from(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    /// Provider settings without keys; the caller fills those in from the
    /// environment exactly once.
    pub fn provider_settings(&self) -> ProviderSettings {
        let openai = &self.providers.openai;
        let anthropic = &self.providers.anthropic;
        ProviderSettings {
            openai: ProviderConfig {
                api_key: None,
                base_url: openai.base_url.clone(),
                model: openai.model.clone(),
                max_tokens: None,
            },
            anthropic: ProviderConfig {
                api_key: None,
                base_url: anthropic.base_url.clone(),
                model: anthropic.model.clone(),
                max_tokens: Some(anthropic.max_tokens),
            },
        }
    }

    /// Listen address, with command-line overrides applied
    pub fn listen_addr(&self, bind: Option<IpAddr>, port: Option<u16>) -> SocketAddr {
        SocketAddr::new(
            bind.unwrap_or(self.server.bind),
            port.unwrap_or(self.server.port),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.listen_addr(None, None).to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.providers.openai.model, "gpt-4");
        assert_eq!(cfg.providers.anthropic.max_tokens, 1024);
    }

    #[test]
    fn test_missing_optional_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RelayConfig::load_from(&dir.path().join("config.toml"), false).unwrap();
        assert_eq!(cfg, RelayConfig::default());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = Some(dir.path().join("nope.toml"));
        let err = RelayConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }

    #[test]
    fn test_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9001

[providers.anthropic]
base_url = "http://127.0.0.1:4010"
"#
        )
        .unwrap();

        let cfg = RelayConfig::load(&Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.server.port, 9001);
        assert_eq!(cfg.server.bind, default_bind());
        assert_eq!(cfg.providers.anthropic.base_url, "http://127.0.0.1:4010");
        assert_eq!(cfg.providers.anthropic.model, "claude-3-sonnet-20240229");
        assert_eq!(cfg.providers.openai, OpenAiConfig::default());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"eighty\"").unwrap();
        let err = RelayConfig::load(&Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_provider_settings_have_no_keys() {
        let settings = RelayConfig::default().provider_settings();
        assert!(settings.openai.api_key.is_none());
        assert!(settings.anthropic.api_key.is_none());
        assert_eq!(settings, ProviderSettings::default());
    }

    #[test]
    fn test_listen_addr_overrides() {
        let cfg = RelayConfig::default();
        let addr = cfg.listen_addr(Some("0.0.0.0".parse().unwrap()), Some(3000));
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
