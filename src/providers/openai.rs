//! OpenAI-compatible provider implementation
//!
//! Talks to any server exposing the `/chat/completions` API: OpenAI itself,
//! Azure-style gateways, vLLM, LM Studio and similar. `endpoint` selects the
//! base URL.

use crate::config::LlmConfig;
use crate::error::{CodeAssistantError, Result};
use crate::providers::base::{send_with_retry, RetryPolicy};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default base URL for the OpenAI API
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Provider for OpenAI-compatible chat completion APIs
pub struct OpenAiProvider {
    client: Client,
    provider_name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a provider from `config`
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &LlmConfig) -> Result<Self> {
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
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        tracing::info!(
            "Initialized OpenAI-compatible provider: provider={}, base={}, model={}",
            config.provider,
            base_url,
            config.model
        );

        Ok(Self {
            client,
            provider_name: config.provider.clone(),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!("Sending chat completion request: {} messages", messages.len());

        let response = send_with_retry(&self.provider_name, self.retry, || {
            let builder = self.client.post(&url).json(&request);
            match &self.api_key {
                Some(key) => builder.bearer_auth(key),
                None => builder,
            }
        })
        .await?;

        let chat: ChatResponse = response.json().await.map_err(|e| {
            CodeAssistantError::Provider(format!(
                "Failed to parse {} response: {}",
                self.provider_name, e
            ))
        })?;

        let (content, finish_reason) = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| Some((choice.message.content?, choice.finish_reason)))
            .ok_or_else(|| {
                CodeAssistantError::Provider(format!(
                    "{} returned no completion choices",
                    self.provider_name
                ))
            })?;

        let message = Message::assistant(content);
        let response = match chat.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        };
        Ok(response.with_stop_reason(finish_reason.as_deref()))
    }
}
