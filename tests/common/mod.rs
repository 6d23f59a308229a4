use assert_cmd::Command;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use codeassistant::providers::{CompletionResponse, Message, Provider};

const CA_ENV_VARS: &[&str] = &[
    "CA_CONFIG",
    "CA_LLM_PROVIDER",
    "CA_LLM_MODEL",
    "CA_LLM_API_KEY",
    "CA_LLM_ENDPOINT",
    "CA_LLM_MAX_TOKENS",
    "CA_LLM_MAX_RETRIES",
    "CA_LLM_RETRY_DELAY_MS",
    "CA_LLM_TEMPERATURE",
    "CA_STORE_SUMMARY",
];

/// `ca` binary running in `dir` with a clean environment
#[allow(dead_code)]
pub fn ca(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ca").expect("ca binary should build");
    cmd.current_dir(dir).env("NO_COLOR", "1");
    for var in CA_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join(".ca.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent dir");
    }
    fs::write(&path, contents).expect("failed to write file");
    path
}

/// Provider answering with canned responses in order
#[allow(dead_code)]
pub struct FakeProvider {
    responses: Mutex<VecDeque<String>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, _messages: &[Message]) -> codeassistant::Result<CompletionResponse> {
        let next = self
            .responses
            .lock()
            .expect("lock poisoned")
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("fake provider ran out of responses"))?;
        Ok(CompletionResponse::new(Message::assistant(next)))
    }
}
