//! Session store
//!
//! Reads and writes the active session file (`.ca_session.json`) and the
//! history directory (`.ca_sessions/`) of a working directory. All I/O is
//! synchronous and every operation runs to completion before returning.

use super::types::{ArchivedSession, Session};
use chrono::{DateTime, Local, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the active session inside a working directory
pub const SESSION_FILE_NAME: &str = ".ca_session.json";

/// Directory name holding archived sessions inside a working directory
pub const SESSION_HISTORY_DIR_NAME: &str = ".ca_sessions";

/// Errors raised by session lifecycle operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// No directory was given to start a session in
    #[error("session directory was not specified")]
    DirNotSpecified,

    /// No session name was given
    #[error("session name was not specified")]
    NameNotSpecified,

    /// The session root directory could not be created
    #[error("failed to create session root directory {}: {source}", .path.display())]
    RootCreate { path: PathBuf, source: io::Error },

    /// The history directory could not be created
    #[error("failed to create session history directory {}: {source}", .path.display())]
    HistoryCreate { path: PathBuf, source: io::Error },

    /// Checking for the active session file failed for a reason other than absence
    #[error("failed to check if session file {} exists: {source}", .path.display())]
    ExistenceCheck { path: PathBuf, source: io::Error },

    /// `start` was called while a session is active
    #[error("session already in progress")]
    Exists,

    /// No active session file is present
    #[error("no active session found")]
    NoActiveSession,

    /// The active session file exists but could not be read
    #[error("failed to read session file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The active session file is not a valid session
    #[error("failed to parse session file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The session could not be serialized
    #[error("failed to serialize session: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The active session file could not be written
    #[error("failed to write session file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The history directory is absent when archiving
    #[error("session history directory {} does not exist", .0.display())]
    HistoryMissing(PathBuf),

    /// The archive file could not be written
    #[error("failed to archive session to {}: {source}", .path.display())]
    Archive { path: PathBuf, source: io::Error },

    /// The active session file could not be removed after archiving
    #[error("failed to delete session file {}: {source}", .path.display())]
    Delete { path: PathBuf, source: io::Error },
}

/// Path of the active session file for `dir`
pub fn session_file_path(dir: &Path) -> PathBuf {
    dir.join(SESSION_FILE_NAME)
}

/// Path of the history directory for `dir`
pub fn history_dir_path(dir: &Path) -> PathBuf {
    dir.join(SESSION_HISTORY_DIR_NAME)
}

/// Create the session root and history directories if needed
///
/// # Returns
///
/// Returns whether an active session file already exists
///
/// # Errors
///
/// Returns `RootCreate` or `HistoryCreate` depending on which directory
/// could not be created, or `ExistenceCheck` if the session file cannot be
/// inspected.
pub fn ensure_storage_layout(dir: &Path) -> Result<bool, SessionError> {
    fs::create_dir_all(dir).map_err(|source| SessionError::RootCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let history_dir = history_dir_path(dir);
    fs::create_dir_all(&history_dir).map_err(|source| SessionError::HistoryCreate {
        path: history_dir.clone(),
        source,
    })?;

    let session_path = session_file_path(dir);
    match fs::metadata(&session_path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SessionError::ExistenceCheck {
            path: session_path,
            source,
        }),
    }
}

/// Start a new session named `name` in `dir`
///
/// # Errors
///
/// Returns `DirNotSpecified`/`NameNotSpecified` for empty inputs, `Exists`
/// when a session is already active, or any layout/write error.
///
/// # Examples
///
/// ```
/// use codeassistant::session::store;
///
/// let dir = tempfile::tempdir().unwrap();
/// let session = store::start(dir.path(), "Add logging").unwrap();
/// assert!(session.steps.is_empty());
/// assert!(store::session_file_path(dir.path()).exists());
/// ```
pub fn start(dir: &Path, name: &str) -> Result<Session, SessionError> {
    if dir.as_os_str().is_empty() {
        return Err(SessionError::DirNotSpecified);
    }
    if name.is_empty() {
        return Err(SessionError::NameNotSpecified);
    }

    if ensure_storage_layout(dir)? {
        return Err(SessionError::Exists);
    }

    let session = Session::new(name);
    save(dir, &session)?;

    tracing::info!(id = %session.id, name = %session.name, "Session started");
    Ok(session)
}

/// Load the active session of `dir`
///
/// # Errors
///
/// Returns `NoActiveSession` if there is no active file, `Read` if it cannot
/// be read, and `Parse` if its contents are not a session.
pub fn load(dir: &Path) -> Result<Session, SessionError> {
    let path = session_file_path(dir);
    let data = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SessionError::NoActiveSession
        } else {
            SessionError::Read {
                path: path.clone(),
                source,
            }
        }
    })?;

    serde_json::from_str(&data).map_err(|source| SessionError::Parse { path, source })
}

/// Persist `session` as the active session of `dir`
///
/// The file is written to a temporary sibling first and renamed into place,
/// so an interrupted write leaves the previous file intact.
pub fn save(dir: &Path, session: &Session) -> Result<(), SessionError> {
    let path = session_file_path(dir);
    let data = serde_json::to_string_pretty(session).map_err(SessionError::Serialize)?;

    let tmp_path = path.with_extension("json.tmp");
    write_private(&tmp_path, &data, false)
        .and_then(|_| fs::rename(&tmp_path, &path))
        .map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            SessionError::Write {
                path: path.clone(),
                source,
            }
        })?;

    tracing::debug!(path = %path.display(), steps = session.steps.len(), "Session saved");
    Ok(())
}

/// End the active session of `dir` and move it into the history directory
///
/// The active file is only removed after the archive has been written, so
/// any failure before that point leaves the session in place for a retry.
/// If an archive of the same name already exists (same name, same second),
/// the session id's first eight characters are appended to the file name.
///
/// # Errors
///
/// Returns `NoActiveSession` (without touching the filesystem) if no session
/// is active, `HistoryMissing` if the history directory is gone, `Archive`
/// if the archive cannot be written and `Delete` if the active file cannot
/// be removed afterwards.
pub fn end(dir: &Path) -> Result<ArchivedSession, SessionError> {
    let session_path = session_file_path(dir);
    if !session_path.exists() {
        return Err(SessionError::NoActiveSession);
    }

    let mut session = load(dir)?;
    session.completed_at = Some(Utc::now());

    let history_dir = history_dir_path(dir);
    if !history_dir.is_dir() {
        return Err(SessionError::HistoryMissing(history_dir));
    }

    let archive_path = unique_archive_path(&history_dir, &session, &Local::now());
    let data = serde_json::to_string_pretty(&session).map_err(SessionError::Serialize)?;
    write_private(&archive_path, &data, true).map_err(|source| SessionError::Archive {
        path: archive_path.clone(),
        source,
    })?;

    fs::remove_file(&session_path).map_err(|source| SessionError::Delete {
        path: session_path,
        source,
    })?;

    tracing::info!(
        id = %session.id,
        archive = %archive_path.display(),
        "Session ended and archived"
    );

    Ok(ArchivedSession {
        session,
        path: archive_path,
    })
}

/// Archived session files of `dir`, oldest first
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
    let history_dir = history_dir_path(dir);
    if !history_dir.is_dir() {
        return Err(SessionError::HistoryMissing(history_dir));
    }

    let entries = fs::read_dir(&history_dir).map_err(|source| SessionError::Read {
        path: history_dir.clone(),
        source,
    })?;

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SessionError::Read {
            path: history_dir.clone(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

/// Archive file name: sortable local timestamp plus a filesystem-safe name
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use codeassistant::session::store::archive_file_name;
///
/// let at = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
/// assert_eq!(archive_file_name("Fix Login Bug", &at), "20250304-050607_fix_login_bug.json");
/// ```
pub fn archive_file_name(name: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}.json", at.format("%Y%m%d-%H%M%S"), safe_name(name))
}

/// Archive path for `session` that does not collide with an existing archive
fn unique_archive_path(history_dir: &Path, session: &Session, at: &DateTime<Local>) -> PathBuf {
    let path = history_dir.join(archive_file_name(&session.name, at));
    if !path.exists() {
        return path;
    }
    let short_id: String = session.id.chars().filter(|c| *c != '-').take(8).collect();
    history_dir.join(format!(
        "{}_{}_{}.json",
        at.format("%Y%m%d-%H%M%S"),
        safe_name(&session.name),
        short_id
    ))
}

fn safe_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

fn write_private(path: &Path, data: &str, create_new: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()
}
