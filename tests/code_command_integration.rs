//! `code`, `review` and `rollback` against a mocked Ollama server

use std::fs;
use std::path::PathBuf;

use codeassistant::commands::{self, CodeOptions};
use codeassistant::config::{Config, LlmConfig};
use codeassistant::session::store;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

fn ollama_config(server: &MockServer) -> Config {
    Config {
        llm: LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2:latest".to_string(),
            endpoint: Some(server.uri()),
            max_retries: Some(0),
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "message": { "role": "assistant", "content": content },
        "done": true
    }))
}

#[tokio::test]
async fn test_code_review_rollback_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply("```rust\nfn greet() -> &'static str {\n    \"hi\"\n}\n```"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = common::write_file(dir.path(), "src/lib.rs", "fn greet() {}\n");
    store::start(dir.path(), "greeting").unwrap();

    let config = ollama_config(&server);
    let files = vec![PathBuf::from("src/lib.rs")];
    let options = CodeOptions::new("return a greeting", files, &config);
    let step = commands::run_code(dir.path(), &config, &options)
        .await
        .unwrap()
        .expect("step should be recorded");

    assert_eq!(step.id, 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "fn greet() -> &'static str {\n    \"hi\"\n}\n"
    );
    assert_eq!(step.files_diff.modified.len(), 1);
    assert_eq!(
        step.snapshots.values().next().unwrap().as_deref(),
        Some("fn greet() {}\n")
    );

    let reviewed = commands::run_review(dir.path(), true, None).await.unwrap();
    assert_eq!(reviewed.steps.len(), 1);

    let rollback = commands::run_rollback(dir.path(), 1).await.unwrap();
    assert_eq!(rollback.id, 2);
    assert_eq!(fs::read_to_string(&file).unwrap(), "fn greet() {}\n");

    let archived = commands::end_session(dir.path()).unwrap();
    assert_eq!(archived.session.steps.len(), 2);
}

#[tokio::test]
async fn test_combined_request_for_multiple_files() {
    let dir = TempDir::new().unwrap();
    let a = common::write_file(dir.path(), "a.txt", "a\n");
    let b = common::write_file(dir.path(), "b.txt", "b\n");
    let (a, b) = (a.canonicalize().unwrap(), b.canonicalize().unwrap());
    store::start(dir.path(), "combined").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("<<<END FILE>>>"))
        .respond_with(chat_reply(&format!(
            "<<<FILE {}>>>\nA\n<<<END FILE>>>\n<<<FILE {}>>>\nB\n<<<END FILE>>>\n",
            a.display(),
            b.display()
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = ollama_config(&server);
    let options = CodeOptions::new(
        "uppercase",
        vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
        &config,
    );
    let step = commands::run_code(dir.path(), &config, &options)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(step.files_diff.modified.len(), 2);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "A\n");
    assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "B\n");
}

#[tokio::test]
async fn test_dry_run_leaves_files_and_session_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply("changed\n"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = common::write_file(dir.path(), "notes.md", "original\n");
    store::start(dir.path(), "dry").unwrap();

    let config = ollama_config(&server);
    let options = CodeOptions {
        dry_run: true,
        ..CodeOptions::new("rewrite", vec![PathBuf::from("notes.md")], &config)
    };
    let step = commands::run_code(dir.path(), &config, &options).await.unwrap();

    assert!(step.is_none());
    assert_eq!(fs::read_to_string(&file).unwrap(), "original\n");
    assert!(store::load(dir.path()).unwrap().steps.is_empty());
}

#[tokio::test]
async fn test_server_error_records_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = common::write_file(dir.path(), "main.rs", "fn main() {}\n");
    store::start(dir.path(), "failing").unwrap();

    let config = ollama_config(&server);
    let options = CodeOptions::new("break it", vec![PathBuf::from("main.rs")], &config);
    assert!(commands::run_code(dir.path(), &config, &options).await.is_err());

    assert_eq!(fs::read_to_string(&file).unwrap(), "fn main() {}\n");
    assert!(store::load(dir.path()).unwrap().steps.is_empty());
}

#[tokio::test]
async fn test_reply_cut_off_at_token_limit_keeps_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "role": "assistant",
                "content": "fn a() {}\nfn b() {\n    let x ="
            },
            "done": true,
            "done_reason": "length"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let original: String = (0..80)
        .map(|i| format!("fn helper_{}() -> u32 {{ {} }}\n", i, i))
        .collect();
    let file = common::write_file(dir.path(), "lib.rs", &original);
    store::start(dir.path(), "cut-off").unwrap();

    let config = ollama_config(&server);
    let options = CodeOptions::new("document helpers", vec![PathBuf::from("lib.rs")], &config);
    let err = commands::run_code(dir.path(), &config, &options)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("token limit"));
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
    assert!(store::load(dir.path()).unwrap().steps.is_empty());
}

#[tokio::test]
async fn test_revise_redoes_last_step_from_its_snapshot() {
    let dir = TempDir::new().unwrap();
    let file = common::write_file(dir.path(), "lib.rs", "v0\n");
    store::start(dir.path(), "revise").unwrap();

    let provider = common::FakeProvider::new(&["v1\n", "v2\n"]);
    let first = CodeOptions {
        prompt: "first try".to_string(),
        files: vec![PathBuf::from("lib.rs")],
        ..Default::default()
    };
    commands::run_code_with_provider(dir.path(), &provider, &first)
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "v1\n");

    let revise = CodeOptions {
        prompt: "second try".to_string(),
        revise: true,
        ..Default::default()
    };
    let step = commands::run_code_with_provider(dir.path(), &provider, &revise)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(step.id, 2);
    assert!(step.command.flag("revise"));
    assert_eq!(fs::read_to_string(&file).unwrap(), "v2\n");
    assert_eq!(step.snapshots.values().next().unwrap().as_deref(), Some("v0\n"));
}
