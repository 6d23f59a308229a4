//! Configuration management for codeassistant
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then command-line flags (each of which can also come from a `CA_*`
//! environment variable). The resulting [`LlmConfig`] is passed explicitly to
//! whatever needs it; nothing reads provider settings from global state.

use crate::error::{CodeAssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Providers that cannot be used without an API key
pub const PROVIDERS_REQUIRING_API_KEY: &[&str] = &[
    "openai",
    "anthropic",
    "azureopenai",
    "cohere",
    "google",
    "huggingface",
    "replicate",
    "mosaic",
    "promptlayer",
];

/// Default completion token limit
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Default number of retries for failed provider calls
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between provider retries (milliseconds)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Default HTTP timeout for provider calls (seconds)
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Language model provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Code modification settings
    #[serde(default)]
    pub code: CodeConfig,
}

/// Language model provider configuration
///
/// Some fields only matter for certain providers: `api_key` is not needed
/// by Ollama, `endpoint` overrides the provider's default base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name, e.g. "openai", "ollama", "anthropic"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name, e.g. "gpt-4"
    #[serde(default = "default_model")]
    pub model: String,

    /// API key for hosted providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom endpoint (base URL) for the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Maximum tokens for a completion
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Maximum number of retries for a failed call
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Delay between retries in milliseconds
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// HTTP timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            max_tokens: None,
            max_retries: None,
            retry_delay_ms: None,
            temperature: None,
            timeout_seconds: None,
        }
    }
}

impl LlmConfig {
    /// Fill every unset tuning field with its default
    ///
    /// Call this once, before [`LlmConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use codeassistant::config::LlmConfig;
    ///
    /// let config = LlmConfig::default().with_defaults();
    /// assert_eq!(config.max_tokens, Some(200));
    /// assert_eq!(config.max_retries, Some(3));
    /// ```
    pub fn with_defaults(mut self) -> Self {
        self.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
        self.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
        self.retry_delay_ms.get_or_insert(DEFAULT_RETRY_DELAY_MS);
        self.timeout_seconds.get_or_insert(DEFAULT_TIMEOUT_SECONDS);
        if self.api_key.as_deref() == Some("") {
            self.api_key = None;
        }
        if self.endpoint.as_deref() == Some("") {
            self.endpoint = None;
        }
        self
    }

    /// Check that the fields the provider needs are present
    ///
    /// # Errors
    ///
    /// Returns `CodeAssistantError::Config` if the provider or model is
    /// empty or the endpoint is not a URL, and
    /// `CodeAssistantError::MissingCredentials` if a hosted provider has no
    /// API key.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(CodeAssistantError::Config("provider is required".to_string()).into());
        }

        if self.requires_api_key() && self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(CodeAssistantError::MissingCredentials(format!(
                "provider {:?} requires an API token, but none was provided",
                self.provider
            ))
            .into());
        }

        if self.model.is_empty() {
            return Err(CodeAssistantError::Config("model is required".to_string()).into());
        }

        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint).map_err(|e| {
                CodeAssistantError::Config(format!("invalid endpoint {:?}: {}", endpoint, e))
            })?;
        }

        Ok(())
    }

    /// Whether this provider needs an API key
    pub fn requires_api_key(&self) -> bool {
        PROVIDERS_REQUIRING_API_KEY.contains(&self.provider.as_str())
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

/// Code modification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Ask the model for a one-line summary of each step and store it
    #[serde(default)]
    pub store_summary: bool,

    /// Largest file (bytes) that will be sent to the model
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_file_size() -> u64 {
    1_048_576 // 1 MB
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            store_summary: false,
            max_file_size: default_max_file_size(),
        }
    }
}

impl Config {
    /// Load configuration from file with CLI and environment overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_cli_overrides(cli);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CodeAssistantError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| {
                CodeAssistantError::Config(format!("Failed to parse config: {}", e)).into()
            })
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        let llm = &mut self.llm;
        if let Some(provider) = &cli.llm_provider {
            llm.provider = provider.clone();
        }
        if let Some(model) = &cli.llm_model {
            llm.model = model.clone();
        }
        if let Some(api_key) = &cli.llm_api_key {
            llm.api_key = Some(api_key.clone());
        }
        if let Some(endpoint) = &cli.llm_endpoint {
            llm.endpoint = Some(endpoint.clone());
        }
        if cli.llm_max_tokens.is_some() {
            llm.max_tokens = cli.llm_max_tokens;
        }
        if cli.llm_max_retries.is_some() {
            llm.max_retries = cli.llm_max_retries;
        }
        if cli.llm_retry_delay_ms.is_some() {
            llm.retry_delay_ms = cli.llm_retry_delay_ms;
        }
        if cli.llm_temperature.is_some() {
            llm.temperature = cli.llm_temperature;
        }
        if cli.store_summary {
            self.code.store_summary = true;
        }
    }

    /// Validate settings that every command relies on
    ///
    /// Provider settings are validated separately, by the commands that talk
    /// to a model, so that session bookkeeping works without an API key.
    pub fn validate(&self) -> Result<()> {
        if self.code.max_file_size == 0 {
            return Err(CodeAssistantError::Config(
                "code.max_file_size must be greater than 0".to_string(),
            )
            .into());
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(CodeAssistantError::Config(
                    "llm.temperature must be between 0.0 and 2.0".to_string(),
                )
                .into());
            }
        }

        Ok(())
    }
}
