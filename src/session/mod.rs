//! Session lifecycle
//!
//! A session is a JSON file (`.ca_session.json`) in the working directory that
//! accumulates one step per code modification. Ending a session moves it,
//! timestamped, into `.ca_sessions/`.
//!
//! ```text
//! [no session] --start--> [active, 0+ steps] --record--> [active, n+1 steps]
//! [active]     --end----> [no session]
//! ```

pub mod recorder;
pub mod store;
pub mod types;

pub use recorder::{StepRecord, StepRecorder};
pub use store::SessionError;
pub use types::{ArchivedSession, Command, FilesDiff, Session, Step};
