//! Command-line interface definition for codeassistant
//!
//! This module defines the CLI structure using clap's derive API. Global
//! flags configure the language model and can also be supplied through
//! `CA_*` environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ca - AI-powered coding assistant
///
/// Apply model-suggested changes to files and keep a per-directory session
/// log of every step.
#[derive(Parser, Debug, Clone)]
#[command(name = "ca")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "CA_CONFIG", default_value = ".ca.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// LLM provider to use (e.g. openai, ollama, anthropic)
    #[arg(long, env = "CA_LLM_PROVIDER", global = true)]
    pub llm_provider: Option<String>,

    /// LLM model name (e.g. gpt-4, deepseek)
    #[arg(long, env = "CA_LLM_MODEL", global = true)]
    pub llm_model: Option<String>,

    /// API key for the LLM provider (if required)
    #[arg(long, env = "CA_LLM_API_KEY", hide_env_values = true, global = true)]
    pub llm_api_key: Option<String>,

    /// Custom endpoint for the LLM provider (if applicable)
    #[arg(long, env = "CA_LLM_ENDPOINT", global = true)]
    pub llm_endpoint: Option<String>,

    /// Maximum tokens for completion
    #[arg(long, env = "CA_LLM_MAX_TOKENS", global = true)]
    pub llm_max_tokens: Option<u32>,

    /// Maximum number of retries for API calls
    #[arg(long, env = "CA_LLM_MAX_RETRIES", global = true)]
    pub llm_max_retries: Option<u32>,

    /// Delay between retries in milliseconds
    #[arg(long, env = "CA_LLM_RETRY_DELAY_MS", global = true)]
    pub llm_retry_delay_ms: Option<u64>,

    /// Sampling temperature
    #[arg(long, env = "CA_LLM_TEMPERATURE", global = true)]
    pub llm_temperature: Option<f32>,

    /// Store a model-written summary with every step
    #[arg(long, env = "CA_STORE_SUMMARY", global = true)]
    pub store_summary: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a new coding session
    #[command(name = "start-session", alias = "ss")]
    StartSession {
        /// Name of the session to start
        #[arg(short, long)]
        name: String,
    },

    /// Apply AI modifications to code
    Code {
        /// What the model should change
        prompt: String,

        /// Files to modify
        #[arg(short, long = "files", num_args = 1.., value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Apply the prompt to each file individually
        #[arg(long)]
        per_file: bool,

        /// Preview AI-generated changes without modifying files
        #[arg(long)]
        dry_run: bool,

        /// Redo the last step with a new prompt instead of building on it
        #[arg(long)]
        revise: bool,
    },

    /// Show session progress and diffs
    Review {
        /// Show diffs between each step's snapshot and the current files
        #[arg(short, long)]
        diff: bool,

        /// Only show this step
        #[arg(short, long)]
        step: Option<u32>,
    },

    /// Undo a specific AI-modified step
    Rollback {
        /// Step to roll back
        #[arg(short, long)]
        step: u32,
    },

    /// Archive session to historical storage
    #[command(name = "end-session")]
    EndSession,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_cli_parse_start_session() {
        let cli = Cli::try_parse_from(["ca", "start-session", "--name", "Add tests"]).unwrap();
        if let Commands::StartSession { name } = cli.command {
            assert_eq!(name, "Add tests");
        } else {
            panic!("Expected StartSession command");
        }
    }

    #[test]
    fn test_cli_parse_start_session_alias() {
        let cli = Cli::try_parse_from(["ca", "ss", "-n", "Quick"]).unwrap();
        assert!(matches!(cli.command, Commands::StartSession { .. }));
    }

    #[test]
    fn test_cli_start_session_requires_name() {
        assert!(Cli::try_parse_from(["ca", "start-session"]).is_err());
    }

    #[test]
    fn test_cli_parse_code_command() {
        let cli = Cli::try_parse_from([
            "ca",
            "code",
            "add error handling",
            "-f",
            "src/a.rs",
            "-f",
            "src/b.rs",
            "--dry-run",
        ])
        .unwrap();
        if let Commands::Code {
            prompt,
            files,
            per_file,
            dry_run,
            revise,
        } = cli.command
        {
            assert_eq!(prompt, "add error handling");
            assert_eq!(
                files,
                vec![PathBuf::from("src/a.rs"), PathBuf::from("src/b.rs")]
            );
            assert!(!per_file);
            assert!(dry_run);
            assert!(!revise);
        } else {
            panic!("Expected Code command");
        }
    }

    #[test]
    fn test_cli_code_requires_prompt() {
        assert!(Cli::try_parse_from(["ca", "code", "-f", "a.rs"]).is_err());
    }

    #[test]
    fn test_cli_parse_review_and_rollback() {
        let cli = Cli::try_parse_from(["ca", "review", "--diff", "--step", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Review {
                diff: true,
                step: Some(2)
            }
        ));

        let cli = Cli::try_parse_from(["ca", "rollback", "--step", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Rollback { step: 3 }));
    }

    #[test]
    fn test_cli_parse_end_session() {
        let cli = Cli::try_parse_from(["ca", "end-session"]).unwrap();
        assert!(matches!(cli.command, Commands::EndSession));
    }

    #[test]
    fn test_cli_global_llm_flags() {
        let cli = Cli::try_parse_from([
            "ca",
            "--llm-provider",
            "ollama",
            "--llm-max-tokens",
            "1024",
            "end-session",
            "--llm-temperature",
            "0.3",
        ])
        .unwrap();
        assert_eq!(cli.llm_provider.as_deref(), Some("ollama"));
        assert_eq!(cli.llm_max_tokens, Some(1024));
        assert_eq!(cli.llm_temperature, Some(0.3));
    }

    #[test]
    #[serial]
    fn test_cli_reads_endpoint_from_env() {
        std::env::set_var("CA_LLM_ENDPOINT", "http://localhost:9999");
        let cli = Cli::try_parse_from(["ca", "review"]).unwrap();
        std::env::remove_var("CA_LLM_ENDPOINT");
        assert_eq!(cli.llm_endpoint.as_deref(), Some("http://localhost:9999"));
    }
}
