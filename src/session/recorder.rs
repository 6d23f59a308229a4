//! Step recorder
//!
//! Appends steps to the active session and persists the result. A step only
//! counts as recorded once the save succeeded.

use super::store::{self, SessionError};
use super::types::{Command, FilesDiff, Session, Step};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything a step records apart from its id and timestamp
#[derive(Debug, Clone, Default)]
pub struct StepRecord {
    pub prompt: String,
    pub flags: BTreeMap<String, bool>,
    pub applied_files: Vec<PathBuf>,
    pub files_diff: FilesDiff,
    pub snapshots: BTreeMap<PathBuf, Option<String>>,
    pub summary: Option<String>,
}

impl StepRecord {
    /// Create a record for `prompt` acting on `applied_files`
    pub fn new(prompt: impl Into<String>, applied_files: Vec<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            applied_files,
            ..Default::default()
        }
    }

    /// Record a boolean command option
    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    pub fn with_files_diff(mut self, files_diff: FilesDiff) -> Self {
        self.files_diff = files_diff;
        self
    }

    pub fn with_snapshots(mut self, snapshots: BTreeMap<PathBuf, Option<String>>) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }
}

/// Append `record` to `session` as the next sequential step
pub fn append_step(session: &mut Session, record: StepRecord) -> &Step {
    let step = Step {
        id: session.next_step_id(),
        command: Command {
            prompt: record.prompt,
            flags: record.flags,
            applied_files: record.applied_files,
        },
        timestamp: Utc::now(),
        files_diff: record.files_diff,
        snapshots: record.snapshots,
        summary: record.summary,
    };
    session.steps.push(step);
    &session.steps[session.steps.len() - 1]
}

/// Records steps into the active session of a working directory
///
/// # Examples
///
/// ```
/// use codeassistant::session::{store, StepRecord, StepRecorder};
///
/// let dir = tempfile::tempdir().unwrap();
/// store::start(dir.path(), "demo").unwrap();
///
/// let recorder = StepRecorder::new(dir.path());
/// let step = recorder.record(StepRecord::new("add docs", vec![])).unwrap();
/// assert_eq!(step.id, 1);
/// ```
pub struct StepRecorder {
    dir: PathBuf,
}

impl StepRecorder {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Working directory whose session this recorder appends to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the active session, append a step and save it
    ///
    /// # Errors
    ///
    /// Returns `NoActiveSession` when no session is active, or any load/save
    /// error. Nothing is recorded when an error is returned.
    pub fn record(&self, record: StepRecord) -> Result<Step, SessionError> {
        let mut session = store::load(&self.dir)?;
        let step = append_step(&mut session, record).clone();
        store::save(&self.dir, &session)?;

        tracing::info!(
            step = step.id,
            files = step.command.applied_files.len(),
            "Recorded session step"
        );
        Ok(step)
    }
}
