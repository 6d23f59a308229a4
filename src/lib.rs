//! codeassistant - AI coding assistant CLI library
//!
//! This library provides the core functionality behind the `ca` binary:
//! session lifecycle management, language model providers, AI-driven file
//! modification, and configuration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Active session file, step recording and archiving
//! - `providers`: Language model abstraction and implementations (OpenAI-compatible, Anthropic, Ollama)
//! - `prompts`: Prompt text sent to the model
//! - `tools`: Path validation, file operations, diffs and the code modifier
//! - `commands`: Handlers for the CLI commands
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use codeassistant::session::{store, StepRecord, StepRecorder};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let dir = Path::new(".");
//!     store::start(dir, "tidy up")?;
//!     StepRecorder::new(dir).record(StepRecord::new("rename helpers", vec![]))?;
//!     let archived = store::end(dir)?;
//!     println!("archived to {}", archived.path.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use config::Config;
pub use error::{CodeAssistantError, Result};
pub use session::{Session, SessionError, Step};

#[cfg(test)]
pub mod test_utils;
