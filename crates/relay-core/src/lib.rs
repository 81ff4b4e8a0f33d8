//! relay-core - provider clients behind the duorelay endpoint
//!
//! This crate provides:
//! - The [`ChatProvider`] trait and OpenAI / Anthropic clients
//! - [`ProviderError`], the error taxonomy the gateway turns into replies
//! - [`ProviderHandles`], built once at startup from [`ProviderSettings`]

pub mod error;
pub mod providers;
pub mod registry;
pub mod settings;

// Re-export main types for convenience
pub use error::ProviderError;
pub use providers::{ChatMessage, ChatProvider, ChatRole};
pub use registry::ProviderHandles;
pub use settings::{ProviderConfig, ProviderKind, ProviderSettings};

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}
