//! Provider module for the code assistant
//!
//! This module contains the language model abstraction and its
//! implementations for OpenAI-compatible APIs, Anthropic and Ollama.

pub mod anthropic;
pub mod base;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use base::{CompletionResponse, Message, Provider, RetryPolicy, StopReason, TokenUsage};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::LlmConfig;
use crate::error::Result;

/// Create a provider instance based on configuration
///
/// `ollama` and `anthropic` get their native clients. Every other provider
/// name is served by the OpenAI-compatible client, with `endpoint` selecting
/// the server.
///
/// # Errors
///
/// Returns error if provider initialization fails
///
/// # Examples
///
/// ```no_run
/// use codeassistant::config::LlmConfig;
/// use codeassistant::providers::create_provider;
///
/// # fn example() -> codeassistant::error::Result<()> {
/// let config = LlmConfig {
///     provider: "ollama".to_string(),
///     model: "qwen2.5-coder".to_string(),
///     ..LlmConfig::default()
/// };
/// let provider = create_provider(&config.with_defaults())?;
/// assert_eq!(provider.name(), "ollama");
/// # Ok(())
/// # }
/// ```
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn Provider>> {
    let provider: Box<dyn Provider> = match config.provider.to_lowercase().as_str() {
        "ollama" => Box::new(OllamaProvider::new(config)?),
        "anthropic" => Box::new(AnthropicProvider::new(config)?),
        _ => Box::new(OpenAiProvider::new(config)?),
    };
    tracing::debug!("Created provider: {}", provider.name());
    Ok(provider)
}
