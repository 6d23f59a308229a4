//! AI-driven code modification
//!
//! [`CodeModifier`] reads the target files, asks the provider for their new
//! contents and returns one [`Modification`] per file. Nothing is written
//! until [`apply`] is called, which lets dry runs show diffs without touching
//! the working tree.

use crate::config::CodeConfig;
use crate::error::{CodeAssistantError, Result};
use crate::prompts::{
    build_combined_prompt, build_file_prompt, build_summary_prompt, FileContext,
    FILE_END_MARKER, FILE_START_PREFIX, FILE_START_SUFFIX,
};
use crate::providers::Provider;
use crate::session::FilesDiff;
use crate::tools::{file_ops, file_utils};

use regex::Regex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Longest summary kept for a step
pub const MAX_SUMMARY_CHARS: usize = 120;

/// New contents proposed for one file
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Contents before the change, `None` if the file does not exist
    pub original: Option<String>,
    /// Contents proposed by the model
    pub modified: String,
}

impl Modification {
    /// True when applying would change the file on disk
    pub fn is_changed(&self) -> bool {
        self.original.as_deref() != Some(self.modified.as_str())
    }

    /// Unified diff from the original to the proposed contents
    pub fn diff(&self) -> String {
        file_ops::generate_diff(&self.path, self.original.as_deref(), Some(&self.modified))
    }
}

/// Produces file modifications from a prompt using a provider
pub struct CodeModifier<'a> {
    provider: &'a dyn Provider,
    max_file_size: u64,
}

impl<'a> CodeModifier<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            max_file_size: CodeConfig::default().max_file_size,
        }
    }

    /// Refuse to send files larger than `max_file_size` bytes
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Ask the provider for new contents of every file in `files`
    ///
    /// In per-file mode one request is sent per file. Otherwise a single
    /// request carries every file in delimited blocks and the answer is split
    /// back into files. A single file always uses the per-file prompt.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty prompt or file list, an error if a
    /// file is too large or unreadable, the provider's error, or
    /// `Modification` if a combined answer is missing a file.
    pub async fn modify(
        &self,
        prompt: &str,
        files: &[PathBuf],
        per_file: bool,
    ) -> Result<Vec<Modification>> {
        if prompt.trim().is_empty() {
            return Err(CodeAssistantError::InvalidInput("prompt is empty".to_string()).into());
        }
        if files.is_empty() {
            return Err(CodeAssistantError::InvalidInput("no files given".to_string()).into());
        }

        let originals = self.read_originals(files).await?;

        if per_file || originals.len() == 1 {
            let mut modifications = Vec::with_capacity(originals.len());
            for (path, original) in originals {
                tracing::info!("Requesting changes for {}", path.display());
                let file = FileContext::new(&path, original.as_deref());
                let response = self
                    .provider
                    .generate(&build_file_prompt(prompt, &file))
                    .await?;
                modifications.push(Modification {
                    modified: strip_code_fence(&response).to_string(),
                    path,
                    original,
                });
            }
            return Ok(modifications);
        }

        let contexts: Vec<FileContext<'_>> = originals
            .iter()
            .map(|(path, original)| FileContext::new(path, original.as_deref()))
            .collect();
        tracing::info!("Requesting changes for {} files in one request", contexts.len());
        let response = self
            .provider
            .generate(&build_combined_prompt(prompt, &contexts))
            .await?;
        let mut blocks = parse_file_blocks(&response)?;

        originals
            .into_iter()
            .map(|(path, original)| {
                let modified = blocks.remove(&path).ok_or_else(|| {
                    CodeAssistantError::Modification(format!(
                        "response did not include {}",
                        path.display()
                    ))
                })?;
                Ok(Modification {
                    path,
                    original,
                    modified,
                })
            })
            .collect()
    }

    /// Ask the provider for a one-line summary of `modifications`
    ///
    /// # Errors
    ///
    /// Returns the provider's error
    pub async fn summarize(&self, prompt: &str, modifications: &[Modification]) -> Result<String> {
        let diff = modifications
            .iter()
            .map(Modification::diff)
            .collect::<Vec<_>>()
            .join("\n");
        let response = self
            .provider
            .generate(&build_summary_prompt(prompt, &diff))
            .await?;
        Ok(clean_summary(&response))
    }

    async fn read_originals(&self, files: &[PathBuf]) -> Result<Vec<(PathBuf, Option<String>)>> {
        let mut originals = Vec::with_capacity(files.len());
        for path in files {
            if path.is_file() {
                file_utils::check_file_size(path, self.max_file_size).await?;
            }
            originals.push((path.clone(), file_ops::read_optional(path).await?));
        }
        Ok(originals)
    }
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)\A\s*```[^\n`]*\n(.*?)\n?```\s*\z").ok())
        .as_ref()
}

/// Unwrap a response that is entirely one markdown code fence
///
/// Responses without a fence, or with more than one, are returned as is.
///
/// # Examples
///
/// ```
/// use codeassistant::tools::code_edit::strip_code_fence;
///
/// assert_eq!(strip_code_fence("```rust\nfn a() {}\n```"), "fn a() {}\n");
/// assert_eq!(strip_code_fence("plain"), "plain");
/// ```
pub fn strip_code_fence(response: &str) -> std::borrow::Cow<'_, str> {
    let inner = fence_regex()
        .and_then(|re| re.captures(response))
        .and_then(|c| c.get(1));
    match inner {
        Some(inner) if !inner.as_str().contains("```") => {
            let body = inner.as_str();
            if body.is_empty() || body.ends_with('\n') {
                body.into()
            } else {
                format!("{}\n", body).into()
            }
        }
        _ => response.into(),
    }
}

/// Split a combined response into file contents keyed by path
///
/// # Errors
///
/// Returns `Modification` for a block without its closing marker, or when
/// the response holds no blocks at all
pub fn parse_file_blocks(response: &str) -> Result<BTreeMap<PathBuf, String>> {
    let mut blocks = BTreeMap::new();
    let mut current: Option<(PathBuf, Vec<&str>)> = None;

    for line in response.lines() {
        let trimmed = line.trim_end();
        match current.take() {
            Some((path, body)) if trimmed == FILE_END_MARKER => {
                let mut contents = body.join("\n");
                if !contents.is_empty() {
                    contents.push('\n');
                }
                blocks.insert(path, strip_code_fence(&contents).into_owned());
            }
            Some((path, mut body)) => {
                body.push(line);
                current = Some((path, body));
            }
            None => {
                if let Some(path) = parse_header(trimmed) {
                    current = Some((path, Vec::new()));
                }
            }
        }
    }

    if let Some((path, _)) = current {
        return Err(CodeAssistantError::Modification(format!(
            "block for {} is missing {}",
            path.display(),
            FILE_END_MARKER
        ))
        .into());
    }
    if blocks.is_empty() {
        return Err(
            CodeAssistantError::Modification("response contained no file blocks".to_string())
                .into(),
        );
    }
    Ok(blocks)
}

fn parse_header(line: &str) -> Option<PathBuf> {
    let path = line
        .trim_start()
        .strip_prefix(FILE_START_PREFIX)?
        .strip_suffix(FILE_START_SUFFIX)?
        .trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn clean_summary(response: &str) -> String {
    let line = response
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim_end_matches('.');
    line.chars().take(MAX_SUMMARY_CHARS).collect()
}

/// Write every changed modification to disk
///
/// Unchanged files are skipped. Returns the files created and modified.
///
/// # Errors
///
/// Returns error on the first file that cannot be written
pub async fn apply(modifications: &[Modification]) -> Result<FilesDiff> {
    let mut diff = FilesDiff::default();
    for modification in modifications.iter().filter(|m| m.is_changed()) {
        file_ops::write_file(&modification.path, &modification.modified).await?;
        if modification.original.is_some() {
            diff.modified.push(modification.path.clone());
        } else {
            diff.created.push(modification.path.clone());
        }
    }
    tracing::info!(
        "Applied modifications: {} created, {} modified",
        diff.created.len(),
        diff.modified.len()
    );
    Ok(diff)
}
