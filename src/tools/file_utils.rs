//! File utilities module for path validation and file safety checks
//!
//! This module provides the checks every file the assistant touches goes
//! through before any I/O happens:
//! - Path validation against the working directory
//! - Parent directory creation
//! - File size checking

use crate::session::store::{SESSION_FILE_NAME, SESSION_HISTORY_DIR_NAME};

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error type for path validation
#[derive(Error, Debug)]
pub enum PathError {
    /// No path was given
    #[error("File path is empty")]
    Empty,

    /// Path could not be made absolute or resolved
    #[error("Cannot resolve path {0}")]
    Unresolvable(String),

    /// Path resolves outside the working directory
    #[error("Path outside working directory: {0}")]
    OutsideWorkingDir(String),

    /// Path belongs to the session files of the working directory
    #[error("Path is reserved for session storage: {0}")]
    SessionStorage(String),
}

/// Error type for file checks that run after validation
#[derive(Error, Debug)]
pub enum FileUtilsError {
    /// File size exceeds maximum allowed
    #[error("File {path} is {size} bytes, exceeding the maximum of {max} bytes")]
    FileTooLarge { path: String, size: u64, max: u64 },

    /// Parent directory creation failed
    #[error("Parent directory creation failed: {0}")]
    ParentDirCreation(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Validates file paths against the working directory
///
/// Relative paths are joined to the working directory, `.` and `..` are
/// folded lexically, and symlinks in the existing part of the path are
/// resolved. The result must lie inside the working directory.
///
/// # Examples
///
/// ```
/// use codeassistant::tools::file_utils::PathValidator;
///
/// let dir = tempfile::tempdir().unwrap();
/// let validator = PathValidator::new(dir.path().to_path_buf());
///
/// assert!(validator.validate("src/main.rs").is_ok());
/// assert!(validator.validate("../escape.rs").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PathValidator {
    working_dir: PathBuf,
}

impl PathValidator {
    /// Creates a new path validator rooted at `working_dir`
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Returns a reference to the working directory
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Validates `target` and returns its absolute, resolved path
    ///
    /// # Errors
    ///
    /// - `PathError::Empty` for an empty path
    /// - `PathError::Unresolvable` if the working directory or an existing
    ///   part of the path cannot be resolved, or `..` climbs above the root
    /// - `PathError::OutsideWorkingDir` if the resolved path is not inside
    ///   the working directory
    /// - `PathError::SessionStorage` for the active session file, its
    ///   temporary sibling, or anything under the history directory
    pub fn validate(&self, target: impl AsRef<Path>) -> Result<PathBuf, PathError> {
        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            return Err(PathError::Empty);
        }

        let working = self.working_dir.canonicalize().map_err(|e| {
            PathError::Unresolvable(format!("{}: {}", self.working_dir.display(), e))
        })?;

        let joined = if target.is_absolute() {
            target.to_path_buf()
        } else {
            working.join(target)
        };
        let normalized = normalize_lexically(&joined)
            .ok_or_else(|| PathError::Unresolvable(target.display().to_string()))?;
        let resolved = resolve_existing_prefix(&normalized)
            .map_err(|e| PathError::Unresolvable(format!("{}: {}", target.display(), e)))?;

        if resolved == working || !resolved.starts_with(&working) {
            tracing::warn!(
                "Rejected path {} outside {}",
                target.display(),
                working.display()
            );
            return Err(PathError::OutsideWorkingDir(target.display().to_string()));
        }

        if is_session_storage(&working, &resolved) {
            tracing::warn!("Rejected session storage path {}", target.display());
            return Err(PathError::SessionStorage(target.display().to_string()));
        }

        Ok(resolved)
    }

    /// Validates every path in `targets`, stopping at the first failure
    pub fn validate_all(&self, targets: &[PathBuf]) -> Result<Vec<PathBuf>, PathError> {
        targets.iter().map(|t| self.validate(t)).collect()
    }
}

/// True for `.ca_session.json`, `.ca_session.json.tmp` and `.ca_sessions/**`
fn is_session_storage(working: &Path, resolved: &Path) -> bool {
    let first = resolved
        .strip_prefix(working)
        .ok()
        .and_then(|rel| rel.components().next());
    match first {
        Some(Component::Normal(name)) => {
            let name = name.to_string_lossy();
            name.starts_with(SESSION_FILE_NAME) || name == SESSION_HISTORY_DIR_NAME
        }
        _ => false,
    }
}

/// Folds `.` and `..` components without touching the filesystem
///
/// Returns `None` when `..` would climb above the root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Canonicalizes the longest existing ancestor of `path` and re-appends the rest
fn resolve_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        match existing.symlink_metadata() {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        rest.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => break,
                }
            }
            Err(e) => return Err(e),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in rest.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Ensures parent directories exist for a given path
///
/// # Errors
///
/// Returns `FileUtilsError::ParentDirCreation` if directory creation fails
pub async fn ensure_parent_dirs(path: &Path) -> Result<(), FileUtilsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FileUtilsError::ParentDirCreation(format!(
                    "Failed to create parent directories for {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// Checks if a file's size exceeds the maximum allowed
///
/// Returns the file size when it is within `max_size`.
///
/// # Errors
///
/// Returns `FileUtilsError::FileTooLarge` if the file exceeds `max_size`, or
/// `FileUtilsError::Io` if its metadata cannot be read
pub async fn check_file_size(path: &Path, max_size: u64) -> Result<u64, FileUtilsError> {
    let file_size = tokio::fs::metadata(path).await?.len();
    if file_size > max_size {
        return Err(FileUtilsError::FileTooLarge {
            path: path.display().to_string(),
            size: file_size,
            max: max_size,
        });
    }
    Ok(file_size)
}
