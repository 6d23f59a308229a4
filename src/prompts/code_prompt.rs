//! Code modification prompts
//!
//! Builds the user prompt for a single file and the combined prompt that
//! carries several files in delimited blocks.

use std::path::Path;

/// Opening of a file block header, followed by the path and [`FILE_START_SUFFIX`]
pub const FILE_START_PREFIX: &str = "<<<FILE ";

/// Closing of a file block header
pub const FILE_START_SUFFIX: &str = ">>>";

/// Line that ends a file block
pub const FILE_END_MARKER: &str = "<<<END FILE>>>";

/// A file handed to the model: its path and current contents
///
/// `contents` is `None` when the file does not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    pub path: &'a Path,
    pub contents: Option<&'a str>,
}

impl<'a> FileContext<'a> {
    pub fn new(path: &'a Path, contents: Option<&'a str>) -> Self {
        Self { path, contents }
    }
}

/// Header line that opens the block for `path`
pub fn file_header(path: &Path) -> String {
    format!("{}{}{}", FILE_START_PREFIX, path.display(), FILE_START_SUFFIX)
}

fn describe_contents(contents: Option<&str>) -> &str {
    match contents {
        Some(text) if !text.is_empty() => text,
        Some(_) => "(empty file)",
        None => "(file does not exist yet)",
    }
}

/// Builds the prompt for modifying one file
///
/// # Examples
///
/// ```
/// use codeassistant::prompts::{build_file_prompt, FileContext};
/// use std::path::Path;
///
/// let file = FileContext::new(Path::new("/work/src/lib.rs"), Some("fn a() {}"));
/// let prompt = build_file_prompt("rename a to b", &file);
/// assert!(prompt.contains("rename a to b"));
/// assert!(prompt.contains("/work/src/lib.rs"));
/// ```
pub fn build_file_prompt(instructions: &str, file: &FileContext<'_>) -> String {
    format!(
        r#"INSTRUCTIONS:
{instructions}

FILE: {path}

CURRENT CONTENTS:
{contents}

Respond with the full replacement contents of {path} and nothing else."#,
        instructions = instructions.trim(),
        path = file.path.display(),
        contents = describe_contents(file.contents),
    )
}

/// Builds one prompt covering every file in `files`
///
/// Each file is sent in a block opened by `<<<FILE path>>>` and closed by
/// `<<<END FILE>>>`, and the model is asked to answer in the same format.
pub fn build_combined_prompt(instructions: &str, files: &[FileContext<'_>]) -> String {
    let blocks = files
        .iter()
        .map(|file| {
            format!(
                "{}\n{}\n{}",
                file_header(file.path),
                describe_contents(file.contents),
                FILE_END_MARKER
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"INSTRUCTIONS:
{instructions}

The files below are delimited by "{start}<path>{suffix}" and "{end}" lines.

{blocks}

Respond with every file listed above, each in its own block using exactly the same delimiters and paths.
Write the full replacement contents inside each block and nothing outside the blocks."#,
        instructions = instructions.trim(),
        start = FILE_START_PREFIX,
        suffix = FILE_START_SUFFIX,
        end = FILE_END_MARKER,
        blocks = blocks,
    )
}
