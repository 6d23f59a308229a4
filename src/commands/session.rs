//! `start-session` and `end-session` handlers

use crate::commands::format_duration;
use crate::error::Result;
use crate::session::{store, ArchivedSession, Session};

use colored::Colorize;
use std::path::Path;

/// Start a session named `name` in `dir`
///
/// # Errors
///
/// Returns the store's error, e.g. `SessionError::Exists` when a session is
/// already active
pub fn start_session(dir: &Path, name: &str) -> Result<Session> {
    let session = store::start(dir, name)?;
    tracing::info!("Started session {} ({})", session.name, session.id);

    println!(
        "{} {} {}",
        "Session started:".green().bold(),
        session.name.bold(),
        format!("({})", session.id).dimmed()
    );
    Ok(session)
}

/// End the active session in `dir` and archive it
///
/// # Errors
///
/// Returns the store's error, e.g. `SessionError::NoActiveSession`
pub fn end_session(dir: &Path) -> Result<ArchivedSession> {
    let archived = store::end(dir)?;
    let session = &archived.session;
    tracing::info!("Ended session {} ({})", session.name, session.id);

    println!(
        "{} {}",
        "Session ended:".green().bold(),
        session.name.bold()
    );
    if let Some(duration) = session.duration() {
        println!("  Duration: {}", format_duration(duration));
    }
    println!("  Steps:    {}", session.steps.len());
    println!("  Archived: {}", archived.path.display());
    Ok(archived)
}
