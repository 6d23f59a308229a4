//! Anthropic provider implementation
//!
//! Uses the Messages API (`/v1/messages`). System messages are sent through
//! the top-level `system` field rather than the message list.

use crate::config::LlmConfig;
use crate::error::{CodeAssistantError, Result};
use crate::providers::base::{send_with_retry, RetryPolicy};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default base URL for the Anthropic API
pub const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider for the Anthropic Messages API
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    #[serde(default)]
    input_tokens: usize,
    #[serde(default)]
    output_tokens: usize,
}

impl AnthropicProvider {
    /// Create a provider from `config`
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` without an API key, or an error if the
    /// HTTP client cannot be built
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| CodeAssistantError::MissingCredentials("anthropic".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("codeassistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CodeAssistantError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        tracing::info!(
            "Initialized Anthropic provider: base={}, model={}",
            base_url,
            config.model
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> MessagesRequest<'a> {
        let system = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then_some(system),
            messages: messages.iter().filter(|m| m.role != "system").collect(),
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = self.build_request(messages);

        let response = send_with_retry("Anthropic", self.retry, || {
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
        })
        .await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            CodeAssistantError::Provider(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let message = Message::assistant(text);
        let response = match parsed.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.input_tokens, usage.output_tokens),
            ),
            None => CompletionResponse::new(message),
        };
        Ok(response.with_stop_reason(parsed.stop_reason.as_deref()))
    }
}
