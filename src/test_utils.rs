//! Test utilities for the code assistant
//!
//! This module provides common test helpers: temporary directories, test
//! files, error assertions and a scripted provider that answers with canned
//! responses.

use crate::error::Result;
use crate::providers::{CompletionResponse, Message, Provider};
use crate::session::{self, Session};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Start a session named `name` in a fresh temporary directory
pub fn temp_session(name: &str) -> (TempDir, Session) {
    let dir = temp_dir();
    let session = session::store::start(dir.path(), name).expect("Failed to start session");
    (dir, session)
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}' but got Ok({:?})", expected, value),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Provider that replays canned responses in order and records each prompt
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// User prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock poisoned").clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        if let Some(last) = messages.iter().rev().find(|m| m.role == "user") {
            self.prompts
                .lock()
                .expect("prompts lock poisoned")
                .push(last.content.clone());
        }
        let next = self
            .responses
            .lock()
            .expect("responses lock poisoned")
            .pop_front()
            .ok_or_else(|| {
                crate::error::CodeAssistantError::Provider("no scripted response left".into())
            })?;
        Ok(CompletionResponse::new(Message::assistant(next)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_file_nested() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "a/b.txt", "x");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x");
    }

    #[test]
    fn test_temp_session_creates_active_file() {
        let (dir, session) = temp_session("demo");
        assert_eq!(session.name, "demo");
        assert!(session::store::session_file_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new(vec!["one", "two"]);
        assert_eq!(provider.generate("first").await.unwrap(), "one");
        assert_eq!(provider.generate("second").await.unwrap(), "two");
        assert_error_contains(provider.generate("third").await, "no scripted response");
        assert_eq!(provider.prompts(), vec!["first", "second", "third"]);
    }
}
