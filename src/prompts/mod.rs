//! Prompts sent to the language model
//!
//! This module holds the shared system prompt and the builders that turn a
//! user instruction plus file contents into the text the provider receives.

pub mod code_prompt;
pub mod summary_prompt;

pub use code_prompt::{
    build_combined_prompt, build_file_prompt, FileContext, FILE_END_MARKER, FILE_START_PREFIX,
    FILE_START_SUFFIX,
};
pub use summary_prompt::build_summary_prompt;

/// System prompt sent ahead of every request
pub const SYSTEM_PROMPT: &str = r#"You are a careful senior software engineer working as a code assistant.
You receive an instruction and the current contents of one or more files.
Apply the instruction and return the COMPLETE new contents of every file you were given.

RULES:
- Return file contents only. No explanations, no commentary before or after.
- Preserve everything the instruction does not ask you to change, including formatting and comments.
- Never abbreviate with placeholders such as "..." or "rest of file unchanged".
- When a file is empty or does not exist yet, write it from scratch."#;
