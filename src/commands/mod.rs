/*!
Command handlers for the CLI

Each handler operates on a working directory and is invoked by the binary
entrypoint:

- `session`: `start-session` and `end-session`
- `code`: apply model-suggested changes and record a step
- `review`: list steps and show diffs against the current files
- `rollback`: restore the files of an earlier step

Handlers return the data they acted upon so tests can inspect it; the
user-facing output is printed as a side effect.
*/

pub mod code;
pub mod review;
pub mod rollback;
pub mod session;

pub use code::{run_code, run_code_with_provider, CodeOptions};
pub use review::run_review;
pub use rollback::run_rollback;
pub use session::{end_session, start_session};

use chrono::Duration;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Format a duration as `1h 02m 03s`, `4m 05s` or `6s`
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use codeassistant::commands::format_duration;
///
/// assert_eq!(format_duration(Duration::seconds(3723)), "1h 02m 03s");
/// assert_eq!(format_duration(Duration::seconds(65)), "1m 05s");
/// assert_eq!(format_duration(Duration::seconds(6)), "6s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Show `path` relative to `dir` when it lies inside it
pub fn display_path(dir: &Path, path: &Path) -> String {
    let base = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    path.strip_prefix(&base)
        .or_else(|_| path.strip_prefix(dir))
        .unwrap_or(path)
        .display()
        .to_string()
}

fn print_file_list(dir: &Path, label: &str, files: &[PathBuf]) {
    for file in files {
        println!("  {} {}", label, display_path(dir, file));
    }
}

/// Print a created/modified/deleted breakdown
pub fn print_files_diff(dir: &Path, diff: &crate::session::FilesDiff) {
    print_file_list(dir, &"created ".green().to_string(), &diff.created);
    print_file_list(dir, &"modified".yellow().to_string(), &diff.modified);
    print_file_list(dir, &"deleted ".red().to_string(), &diff.deleted);
}
