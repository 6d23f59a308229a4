//! `review` handler

use crate::commands::display_path;
use crate::error::{CodeAssistantError, Result};
use crate::session::{store, Session, Step};
use crate::tools::{colorize_diff, file_ops, generate_diff};

use colored::Colorize;
use prettytable::{format, row, Table};
use std::path::{Path, PathBuf};

const PROMPT_WIDTH: usize = 40;

/// Print the steps of the active session, optionally with diffs
///
/// With `show_diff`, every file a selected step snapshotted is compared with
/// its current contents.
///
/// # Errors
///
/// Returns error if no session is active, `step` does not exist, or a file
/// cannot be read
pub async fn run_review(dir: &Path, show_diff: bool, step: Option<u32>) -> Result<Session> {
    let session = store::load(dir)?;
    let steps = select_steps(&session, step)?;

    println!(
        "{} {} {}",
        "Session:".bold(),
        session.name.cyan(),
        format!("({})", session.id).dimmed()
    );
    println!(
        "Started {}, {} step(s)",
        session
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S"),
        session.steps.len()
    );

    if steps.is_empty() {
        println!("{}", "No steps recorded yet.".yellow());
        return Ok(session);
    }

    println!();
    steps_table(dir, &steps).printstd();

    if show_diff {
        for step in &steps {
            println!("\n{}", format!("Step {}", step.id).bold());
            let diffs = step_diffs(step).await?;
            if diffs.is_empty() {
                println!("  {}", "(no differences from the step's snapshot)".dimmed());
            }
            for (path, diff) in diffs {
                println!("{}", display_path(dir, &path).bold());
                println!("{}", colorize_diff(&diff));
            }
        }
    }

    Ok(session)
}

/// The steps to show: one step by id, or all of them
///
/// # Errors
///
/// Returns `InvalidInput` if `step` is given and not found
pub fn select_steps(session: &Session, step: Option<u32>) -> Result<Vec<&Step>> {
    match step {
        Some(id) => session
            .step(id)
            .map(|s| vec![s])
            .ok_or_else(|| {
                CodeAssistantError::InvalidInput(format!("step {} not found", id)).into()
            }),
        None => Ok(session.steps.iter().collect()),
    }
}

/// Build the summary table of `steps`
pub fn steps_table(dir: &Path, steps: &[&Step]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row![b => "Step", "Time", "Prompt", "Flags", "Files", "Changes", "Summary"]);

    for step in steps {
        let flags = step
            .command
            .flags
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let files = step
            .command
            .applied_files
            .iter()
            .map(|p| display_path(dir, p))
            .collect::<Vec<_>>()
            .join("\n");
        let changes = format!(
            "+{} ~{} -{}",
            step.files_diff.created.len(),
            step.files_diff.modified.len(),
            step.files_diff.deleted.len()
        );

        table.add_row(row![
            step.id,
            step.timestamp
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S"),
            truncate(&step.command.prompt, PROMPT_WIDTH),
            flags,
            files,
            changes,
            step.summary.as_deref().unwrap_or("-")
        ]);
    }
    table
}

/// Diffs between a step's snapshots and the files as they are now
///
/// Files that match their snapshot are left out.
///
/// # Errors
///
/// Returns error if a current file cannot be read
pub async fn step_diffs(step: &Step) -> Result<Vec<(PathBuf, String)>> {
    let mut diffs = Vec::new();
    for (path, before) in &step.snapshots {
        let current = file_ops::read_optional(path).await?;
        let diff = generate_diff(path, before.as_deref(), current.as_deref());
        if !diff.is_empty() {
            diffs.push((path.clone(), diff));
        }
    }
    Ok(diffs)
}

fn truncate(text: &str, width: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > width {
        let cut: String = first_line.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else if text.lines().nth(1).is_some() {
        format!("{}...", first_line)
    } else {
        first_line.to_string()
    }
}
