use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One unit of AI-assisted editing work, persisted as `.ca_session.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Name supplied when the session was started
    pub name: String,
    /// When the session was started
    pub created_at: DateTime<Utc>,
    /// When the session was ended; `None` while it is active
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Recorded steps in append order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Session {
    /// Create a fresh session with a new id and no steps
    ///
    /// # Examples
    ///
    /// ```
    /// use codeassistant::session::Session;
    ///
    /// let session = Session::new("refactor parser");
    /// assert_eq!(session.name, "refactor parser");
    /// assert!(session.steps.is_empty());
    /// assert!(session.completed_at.is_none());
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            completed_at: None,
            steps: Vec::new(),
        }
    }

    /// The most recently appended step
    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Id the next appended step will receive
    pub fn next_step_id(&self) -> u32 {
        self.last_step().map_or(1, |step| step.id + 1)
    }

    /// Look up a step by id
    pub fn step(&self, id: u32) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Time between start and completion, if the session has ended
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }
}

/// A single recorded modification within a session
///
/// Steps are never edited once written. Rollbacks and revisions append a
/// new step describing what they restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Sequential id, starting at 1
    pub id: u32,
    /// The command that produced this step
    pub command: Command,
    /// When the step was recorded
    pub timestamp: DateTime<Utc>,
    /// Files touched by the step
    #[serde(default)]
    pub files_diff: FilesDiff,
    /// File contents immediately before the step; `None` for files the step created
    #[serde(default)]
    pub snapshots: BTreeMap<PathBuf, Option<String>>,
    /// Optional one-line description produced by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Prompt, options and target files of a step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    /// Prompt text as given on the command line
    pub prompt: String,
    /// Boolean options the command ran with (`per_file`, `revise`, `rollback`)
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Absolute paths the command acted upon
    #[serde(default)]
    pub applied_files: Vec<PathBuf>,
}

impl Command {
    /// Whether the named flag was set
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

/// Files created, modified and deleted by a step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilesDiff {
    #[serde(default)]
    pub created: Vec<PathBuf>,
    #[serde(default)]
    pub modified: Vec<PathBuf>,
    #[serde(default)]
    pub deleted: Vec<PathBuf>,
}

impl FilesDiff {
    /// True when the step touched no files
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// A session that has been moved into the history directory
#[derive(Debug, Clone)]
pub struct ArchivedSession {
    /// The session as written to the archive
    pub session: Session,
    /// Location of the archive file
    pub path: PathBuf,
}
