//! Error types for codeassistant
//!
//! This module defines the application-level error type. Layer-specific
//! errors (`SessionError`, `PathError`) live next to the code that raises
//! them and convert into [`CodeAssistantError`] with `#[from]`.

use crate::session::SessionError;
use crate::tools::file_utils::PathError;
use thiserror::Error;

/// Main error type for codeassistant operations
///
/// Every failure surfaces as one of these identifiable kinds. Callers holding
/// an `anyhow::Error` can recover the kind with `downcast_ref`.
#[derive(Error, Debug)]
pub enum CodeAssistantError {
    /// Configuration-related errors (missing provider, model or API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, unexpected responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// The model response could not be turned into file contents
    #[error("Modification error: {0}")]
    Modification(String),

    /// Invalid command usage (missing prompt, unknown step, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path validation errors
    #[error(transparent)]
    Path(#[from] PathError),

    /// Session lifecycle errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for codeassistant operations
///
/// Uses `anyhow::Error` so context can be attached while propagating.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = CodeAssistantError::Config("provider is required".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: provider is required"
        );
    }

    #[test]
    fn test_provider_error_display() {
        let error = CodeAssistantError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = CodeAssistantError::MissingCredentials("openai".to_string());
        assert_eq!(error.to_string(), "Missing credentials for provider: openai");
    }

    #[test]
    fn test_session_error_is_transparent() {
        let error: CodeAssistantError = SessionError::NoActiveSession.into();
        assert_eq!(error.to_string(), SessionError::NoActiveSession.to_string());
        assert!(matches!(
            error,
            CodeAssistantError::Session(SessionError::NoActiveSession)
        ));
    }

    #[test]
    fn test_path_error_conversion() {
        let error: CodeAssistantError = PathError::OutsideWorkingDir("/etc/passwd".into()).into();
        assert!(matches!(error, CodeAssistantError::Path(_)));
        assert!(error.to_string().contains("/etc/passwd"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: CodeAssistantError = io_error.into();
        assert!(matches!(error, CodeAssistantError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: CodeAssistantError = json_error.into();
        assert!(matches!(error, CodeAssistantError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodeAssistantError>();
    }
}
