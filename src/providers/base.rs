//! Base provider trait and common types
//!
//! This module defines the Provider trait every language model backend
//! implements, the message and response types shared between them, and the
//! retrying request helper the HTTP providers use.

use crate::config::LlmConfig;
use crate::error::{CodeAssistantError, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message structure for a conversation with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use codeassistant::providers::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use codeassistant::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The model finished its answer
    Complete,
    /// Output was cut off at the token limit
    MaxTokens,
    /// Any other reason the provider reported
    Other(String),
}

impl StopReason {
    /// Map a provider's raw stop reason
    ///
    /// Covers Ollama's `done_reason`, OpenAI's `finish_reason` and
    /// Anthropic's `stop_reason`.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeassistant::providers::StopReason;
    ///
    /// assert_eq!(StopReason::from_provider("length"), StopReason::MaxTokens);
    /// assert_eq!(StopReason::from_provider("max_tokens"), StopReason::MaxTokens);
    /// assert_eq!(StopReason::from_provider("end_turn"), StopReason::Complete);
    /// ```
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" => Self::Complete,
            "length" | "max_tokens" => Self::MaxTokens,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Completion response with message, optional token usage and stop reason
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
    /// Why generation stopped, when the provider says
    pub stop_reason: Option<StopReason>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
            stop_reason: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
            stop_reason: None,
        }
    }

    /// Attach the provider's raw stop reason, if it sent one
    pub fn with_stop_reason(mut self, reason: Option<&str>) -> Self {
        self.stop_reason = reason.map(StopReason::from_provider);
        self
    }

    /// True when the output hit the token limit
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == Some(StopReason::MaxTokens)
    }
}

/// Provider trait for language model backends
///
/// Providers turn a conversation into a completion. Code that only needs
/// "prompt in, text out" calls [`Provider::generate`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in logs and error messages
    fn name(&self) -> &str;

    /// Completes a conversation with the given messages
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails after retries or the response is
    /// invalid
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Generate text for a fully composed prompt
    ///
    /// Sends the shared system prompt followed by `prompt` as the user
    /// message and returns the assistant's text.
    ///
    /// # Errors
    ///
    /// Returns a `Provider` error if the call fails or the answer was cut
    /// off at the token limit
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages = vec![
            Message::system(crate::prompts::SYSTEM_PROMPT),
            Message::user(prompt),
        ];
        let response = self.complete(&messages).await?;
        if let Some(usage) = response.usage {
            tracing::debug!(
                provider = self.name(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion finished"
            );
        }
        if response.is_truncated() {
            tracing::warn!(provider = self.name(), "Completion stopped at the token limit");
            return Err(CodeAssistantError::Provider(format!(
                "{} stopped at the token limit before finishing; \
                 raise llm.max_tokens (--llm-max-tokens) and try again",
                self.name()
            ))
            .into());
        }
        Ok(response.message.content)
    }
}

/// How often and how patiently a provider retries a failed call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Build the policy described by `config`
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries(),
            delay: config.retry_delay(),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send a request, retrying transport failures, 429 and 5xx responses
///
/// `build` is called once per attempt because a `RequestBuilder` is consumed
/// by `send`.
///
/// # Errors
///
/// Returns `CodeAssistantError::Provider` once retries are exhausted or for
/// any other non-success status.
pub async fn send_with_retry<F>(provider: &str, policy: RetryPolicy, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let last_attempt = attempt >= policy.max_retries;
        match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) if is_retryable(response.status()) && !last_attempt => {
                tracing::warn!(
                    "{} returned {}, retrying ({}/{})",
                    provider,
                    response.status(),
                    attempt + 1,
                    policy.max_retries
                );
            }
            Ok(response) => {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                tracing::error!("{} returned error {}: {}", provider, status, error_text);
                return Err(CodeAssistantError::Provider(format!(
                    "{} returned error {}: {}",
                    provider, status, error_text
                ))
                .into());
            }
            Err(e) if !last_attempt => {
                tracing::warn!(
                    "{} request failed: {}, retrying ({}/{})",
                    provider,
                    e,
                    attempt + 1,
                    policy.max_retries
                );
            }
            Err(e) => {
                tracing::error!("{} request failed: {}", provider, e);
                return Err(
                    CodeAssistantError::Provider(format!("{} request failed: {}", provider, e))
                        .into(),
                );
            }
        }

        attempt += 1;
        tokio::time::sleep(policy.delay).await;
    }
}
