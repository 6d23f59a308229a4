//! `rollback` handler

use crate::commands::print_files_diff;
use crate::error::{CodeAssistantError, Result};
use crate::session::{store, Step, StepRecord, StepRecorder};
use crate::tools::{restore_snapshots, snapshot};

use colored::Colorize;
use std::path::{Path, PathBuf};

/// Put the files of step `step_id` back to their contents before that step
///
/// Files the step created are removed. The rollback is recorded as a new
/// step flagged `rollback` whose snapshots hold the contents it replaced,
/// so a rollback can itself be rolled back.
///
/// # Errors
///
/// Returns error if no session is active, the step does not exist or has no
/// snapshots, or a file cannot be restored. If recording fails the restored
/// files are put back.
pub async fn run_rollback(dir: &Path, step_id: u32) -> Result<Step> {
    let session = store::load(dir)?;
    let target = session.step(step_id).ok_or_else(|| {
        CodeAssistantError::InvalidInput(format!("step {} not found", step_id))
    })?;
    if target.snapshots.is_empty() {
        return Err(CodeAssistantError::InvalidInput(format!(
            "step {} has no snapshots to restore",
            step_id
        ))
        .into());
    }

    let files: Vec<PathBuf> = target.snapshots.keys().cloned().collect();
    let before = snapshot(&files).await?;

    let outcome = async {
        let files_diff = restore_snapshots(&target.snapshots).await?;
        let record = StepRecord::new(format!("rollback step {}", step_id), files.clone())
            .with_flag("rollback", true)
            .with_files_diff(files_diff)
            .with_snapshots(before.clone());
        Ok::<_, anyhow::Error>(StepRecorder::new(dir).record(record)?)
    }
    .await;

    let step = match outcome {
        Ok(step) => step,
        Err(e) => {
            if let Err(restore_err) = restore_snapshots(&before).await {
                tracing::error!("Failed to undo partial rollback: {:#}", restore_err);
            }
            return Err(e);
        }
    };

    tracing::info!("Rolled back step {} as step {}", step_id, step.id);
    println!(
        "{}",
        format!("Rolled back step {} (recorded as step {})", step_id, step.id)
            .green()
            .bold()
    );
    if step.files_diff.is_empty() {
        println!("  {}", "Files already matched the snapshot".dimmed());
    } else {
        print_files_diff(dir, &step.files_diff);
    }
    Ok(step)
}
