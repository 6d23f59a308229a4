//! File operations for the code assistant
//!
//! Reading target files, writing modified contents, restoring snapshots and
//! rendering unified diffs. Paths are expected to have been checked by
//! [`PathValidator`](crate::tools::file_utils::PathValidator) already.

use crate::error::Result;
use crate::session::FilesDiff;
use crate::tools::file_utils;

use anyhow::Context;
use colored::Colorize;
use similar::TextDiff;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Read a file, returning `None` when it does not exist
///
/// # Errors
///
/// Returns error for any failure other than the file being absent
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Capture the current contents of every path
///
/// # Errors
///
/// Returns error if an existing file cannot be read
pub async fn snapshot(paths: &[PathBuf]) -> Result<BTreeMap<PathBuf, Option<String>>> {
    let mut snapshots = BTreeMap::new();
    for path in paths {
        snapshots.insert(path.clone(), read_optional(path).await?);
    }
    Ok(snapshots)
}

/// Write `contents` to `path`, creating parent directories as needed
///
/// # Errors
///
/// Returns error if the parent directory cannot be created or the write fails
pub async fn write_file(path: &Path, contents: &str) -> Result<()> {
    file_utils::ensure_parent_dirs(path).await?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Put every file back to its snapshot contents
///
/// Files whose snapshot is `None` did not exist and are removed. Files that
/// already match their snapshot are left untouched. Returns what changed on
/// disk.
///
/// # Errors
///
/// Returns error on the first file that cannot be read, written or removed
pub async fn restore_snapshots(
    snapshots: &BTreeMap<PathBuf, Option<String>>,
) -> Result<FilesDiff> {
    let mut diff = FilesDiff::default();
    for (path, saved) in snapshots {
        let current = read_optional(path).await?;
        match (saved, current) {
            (Some(saved), Some(current)) if *saved == current => {}
            (Some(saved), Some(_)) => {
                write_file(path, saved).await?;
                diff.modified.push(path.clone());
            }
            (Some(saved), None) => {
                write_file(path, saved).await?;
                diff.created.push(path.clone());
            }
            (None, Some(_)) => {
                tokio::fs::remove_file(path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                diff.deleted.push(path.clone());
            }
            (None, None) => {}
        }
    }
    tracing::info!(
        "Restored snapshots: {} created, {} modified, {} deleted",
        diff.created.len(),
        diff.modified.len(),
        diff.deleted.len()
    );
    Ok(diff)
}

/// Unified diff between two versions of `path`
///
/// A missing side is shown as `/dev/null`. Returns an empty string when the
/// versions are identical.
///
/// # Examples
///
/// ```
/// use codeassistant::tools::file_ops::generate_diff;
/// use std::path::Path;
///
/// let diff = generate_diff(Path::new("a.txt"), Some("one\n"), Some("two\n"));
/// assert!(diff.contains("-one"));
/// assert!(diff.contains("+two"));
/// ```
pub fn generate_diff(path: &Path, original: Option<&str>, modified: Option<&str>) -> String {
    let old = original.unwrap_or("");
    let new = modified.unwrap_or("");
    if original.is_some() == modified.is_some() && old == new {
        return String::new();
    }

    let shown = path.display().to_string();
    let old_header = match original {
        Some(_) => format!("a{}", with_slash(&shown)),
        None => "/dev/null".to_string(),
    };
    let new_header = match modified {
        Some(_) => format!("b{}", with_slash(&shown)),
        None => "/dev/null".to_string(),
    };

    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&old_header, &new_header)
        .to_string()
}

fn with_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Color a unified diff for terminal output
pub fn colorize_diff(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
