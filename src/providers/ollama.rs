//! Ollama provider implementation
//!
//! This module implements the Provider trait for Ollama, connecting to a local
//! or remote Ollama server's `/api/chat` endpoint.

use crate::config::LlmConfig;
use crate::error::{CodeAssistantError, Result};
use crate::providers::base::{send_with_retry, RetryPolicy};
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default Ollama server address
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use codeassistant::config::LlmConfig;
/// use codeassistant::providers::{OllamaProvider, Provider};
///
/// # async fn example() -> codeassistant::error::Result<()> {
/// let config = LlmConfig {
///     provider: "ollama".to_string(),
///     model: "llama3.2:latest".to_string(),
///     ..LlmConfig::default()
/// };
/// let provider = OllamaProvider::new(&config)?;
/// let text = provider.generate("Say hello").await?;
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    host: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
}

/// Response structure from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// `config.endpoint` overrides the default host.
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

        let host = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string())
            .trim_end_matches('/')
            .to_string();

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}",
            host,
            config.model
        );

        Ok(Self {
            client,
            host,
            model: config.model.clone(),
            max_tokens: config.max_tokens(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, messages: &[Message]) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let url = format!("{}/api/chat", self.host);
        let request = self.build_request(messages);

        tracing::debug!("Sending Ollama request: {} messages", request.messages.len());

        let response = send_with_retry("Ollama", self.retry, || {
            self.client.post(&url).json(&request)
        })
        .await?;

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            CodeAssistantError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        tracing::debug!(
            "Ollama response: done={}, reason={:?}, prompt_tokens={}, completion_tokens={}",
            ollama_response.done,
            ollama_response.done_reason,
            ollama_response.prompt_eval_count,
            ollama_response.eval_count
        );

        let message = Message::assistant(ollama_response.message.content);
        let response = if ollama_response.prompt_eval_count > 0 || ollama_response.eval_count > 0 {
            CompletionResponse::with_usage(
                message,
                TokenUsage::new(ollama_response.prompt_eval_count, ollama_response.eval_count),
            )
        } else {
            CompletionResponse::new(message)
        };

        Ok(response.with_stop_reason(ollama_response.done_reason.as_deref()))
    }
}
