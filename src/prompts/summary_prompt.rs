//! Step summary prompt

/// Longest diff text forwarded to the model when asking for a summary
pub const MAX_SUMMARY_DIFF_CHARS: usize = 8_000;

/// Builds the prompt asking for a one-line summary of a change
///
/// `diff` is truncated to [`MAX_SUMMARY_DIFF_CHARS`] characters.
///
/// # Examples
///
/// ```
/// use codeassistant::prompts::build_summary_prompt;
///
/// let prompt = build_summary_prompt("add logging", "+ tracing::info!(\"x\");");
/// assert!(prompt.contains("add logging"));
/// assert!(prompt.contains("one line"));
/// ```
pub fn build_summary_prompt(instructions: &str, diff: &str) -> String {
    let diff = match diff.char_indices().nth(MAX_SUMMARY_DIFF_CHARS) {
        Some((cut, _)) => format!("{}\n[diff truncated]", &diff[..cut]),
        None => diff.to_string(),
    };

    format!(
        r#"Summarize the following code change in one line of at most 100 characters.
Reply with the summary only, without quotes or a trailing period.

REQUESTED CHANGE:
{}

DIFF:
{}"#,
        instructions.trim(),
        diff
    )
}
