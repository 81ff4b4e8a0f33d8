//! Upstream LLM provider clients
//!
//! Each provider implements [`ChatProvider`]. Client support can be compiled
//! out with the `openai` / `anthropic` cargo features.

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "openai")]
pub mod openai;
pub mod types;

pub use types::{ChatMessage, ChatProvider, ChatRole};
