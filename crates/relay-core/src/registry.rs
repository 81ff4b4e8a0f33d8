//! Startup wiring: build the optional provider handles exactly once
//!
//! A provider whose key is missing, malformed, or whose client support was
//! compiled out simply stays absent. Nothing here ever fails the process.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ProviderError;
use crate::mask_secret;
use crate::providers::ChatProvider;
use crate::settings::{ProviderConfig, ProviderKind, ProviderSettings};

/// Read-only map from provider identity to an optional, ready client
#[derive(Clone, Default)]
pub struct ProviderHandles {
    openai: Option<Arc<dyn ChatProvider>>,
    anthropic: Option<Arc<dyn ChatProvider>>,
}

impl std::fmt::Debug for ProviderHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandles")
            .field("openai", &self.openai.as_ref().map(|p| p.model().to_string()))
            .field("anthropic", &self.anthropic.as_ref().map(|p| p.model().to_string()))
            .finish()
    }
}

enum BuildFailure {
    Unsupported,
    Failed(ProviderError),
}

impl From<ProviderError> for BuildFailure {
    fn from(e: ProviderError) -> Self {
        Self::Failed(e)
    }
}

impl ProviderHandles {
    /// Build a handle for every provider that has a usable key
    pub fn initialize(settings: &ProviderSettings) -> Self {
        let mut handles = Self::default();

        for kind in ProviderKind::ALL {
            let config = settings.get(kind);
            let Some(api_key) = config.api_key.as_deref() else {
                warn!(
                    "{} was not found in the environment; {} models will not work. Set it in your .env file.",
                    kind.env_var(),
                    kind
                );
                continue;
            };

            info!("{} found: {}", kind.env_var(), mask_secret(api_key));

            match build_provider(kind, api_key, config) {
                Ok(provider) => {
                    info!(
                        "{} client initialized (model={}, base_url={})",
                        kind, config.model, config.base_url
                    );
                    handles.set(kind, provider);
                }
                Err(BuildFailure::Unsupported) => {
                    warn!(
                        "{} client support is not compiled in (enable the `{}` feature); {} models will not work",
                        kind,
                        kind.feature(),
                        kind
                    );
                }
                Err(BuildFailure::Failed(e)) => {
                    warn!(
                        "Error initializing {} client: {}. {} models will not work; double-check {}.",
                        kind,
                        e,
                        kind,
                        kind.env_var()
                    );
                }
            }
        }

        let ready: Vec<&str> = ProviderKind::ALL
            .iter()
            .filter(|k| handles.is_configured(**k))
            .map(|k| k.display_name())
            .collect();
        if ready.is_empty() {
            warn!("No providers configured; every chat request will get a configuration warning");
        } else {
            info!("Providers ready: {}", ready.join(", "));
        }

        handles
    }

    /// Attach a ready provider (used for wiring and by tests with fakes)
    pub fn with(mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) -> Self {
        self.set(kind, provider);
        self
    }

    fn set(&mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) {
        match kind {
            ProviderKind::OpenAi => self.openai = Some(provider),
            ProviderKind::Anthropic => self.anthropic = Some(provider),
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn ChatProvider>> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
        }
    }

    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }
}

fn build_provider(
    kind: ProviderKind,
    api_key: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn ChatProvider>, BuildFailure> {
    match kind {
        ProviderKind::OpenAi => build_openai(api_key, config),
        ProviderKind::Anthropic => build_anthropic(api_key, config),
    }
}

#[cfg(feature = "openai")]
fn build_openai(api_key: &str, config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, BuildFailure> {
    let provider = crate::providers::openai::OpenAiProvider::new(
        api_key,
        config.model.clone(),
        config.base_url.clone(),
    )?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "openai"))]
fn build_openai(_api_key: &str, _config: &ProviderConfig) -> Result<Arc<dyn ChatProvider>, BuildFailure> {
    Err(BuildFailure::Unsupported)
}

#[cfg(feature = "anthropic")]
fn build_anthropic(
    api_key: &str,
    config: &ProviderConfig,
) -> Result<Arc<dyn ChatProvider>, BuildFailure> {
    let provider = crate::providers::anthropic::AnthropicProvider::new(
        api_key,
        config.model.clone(),
        config.base_url.clone(),
        config
            .max_tokens
            .unwrap_or(crate::settings::ANTHROPIC_MAX_TOKENS),
    )?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "anthropic"))]
fn build_anthropic(
    _api_key: &str,
    _config: &ProviderConfig,
) -> Result<Arc<dyn ChatProvider>, BuildFailure> {
    Err(BuildFailure::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn provider_name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, message: &str) -> crate::error::Result<String> {
            Ok(message.to_string())
        }
    }

    fn settings(openai: Option<&str>, anthropic: Option<&str>) -> ProviderSettings {
        let mut s = ProviderSettings::default();
        s.openai.api_key = openai.map(str::to_string);
        s.anthropic.api_key = anthropic.map(str::to_string);
        s
    }

    #[test]
    fn test_initialize_without_keys() {
        let handles = ProviderHandles::initialize(&settings(None, None));
        assert!(!handles.is_configured(ProviderKind::OpenAi));
        assert!(!handles.is_configured(ProviderKind::Anthropic));
    }

    #[cfg(all(feature = "openai", feature = "anthropic"))]
    #[test]
    fn test_initialize_with_both_keys() {
        let handles = ProviderHandles::initialize(&settings(Some("sk-openai"), Some("sk-ant-key")));
        let openai = handles.get(ProviderKind::OpenAi).unwrap();
        assert_eq!(openai.provider_name(), "openai");
        assert_eq!(openai.model(), "gpt-4");
        let anthropic = handles.get(ProviderKind::Anthropic).unwrap();
        assert_eq!(anthropic.provider_name(), "anthropic");
        assert_eq!(anthropic.model(), "claude-3-sonnet-20240229");
    }

    #[cfg(feature = "openai")]
    #[test]
    fn test_malformed_key_leaves_only_that_handle_absent() {
        let handles = ProviderHandles::initialize(&settings(Some("sk-good"), Some("sk-ant\nbad")));
        assert!(handles.is_configured(ProviderKind::OpenAi));
        assert!(!handles.is_configured(ProviderKind::Anthropic));
    }

    #[cfg(not(feature = "openai"))]
    #[test]
    fn test_openai_compiled_out_leaves_handle_absent() {
        let handles = ProviderHandles::initialize(&settings(Some("sk-openai"), None));
        assert!(!handles.is_configured(ProviderKind::OpenAi));
    }

    #[cfg(not(feature = "anthropic"))]
    #[test]
    fn test_anthropic_compiled_out_leaves_handle_absent() {
        let handles = ProviderHandles::initialize(&settings(None, Some("sk-ant-key")));
        assert!(!handles.is_configured(ProviderKind::Anthropic));
    }

    #[test]
    fn test_with_fake_provider() {
        let handles = ProviderHandles::default().with(ProviderKind::Anthropic, Arc::new(EchoProvider));
        assert!(handles.is_configured(ProviderKind::Anthropic));
        assert!(!handles.is_configured(ProviderKind::OpenAi));
        assert!(format!("{:?}", handles).contains("echo-1"));
    }

    #[tokio::test]
    async fn test_handle_is_usable() {
        let handles = ProviderHandles::default().with(ProviderKind::OpenAi, Arc::new(EchoProvider));
        let reply = handles
            .get(ProviderKind::OpenAi)
            .unwrap()
            .complete("ping")
            .await
            .unwrap();
        assert_eq!(reply, "ping");
    }
}
