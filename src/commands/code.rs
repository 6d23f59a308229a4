//! `code` handler
//!
//! Validates the target files, asks the provider for new contents, writes
//! them and records a step. A step is all-or-nothing: if anything fails after
//! files were touched, they are put back the way they were.

use crate::commands::{display_path, print_files_diff};
use crate::config::Config;
use crate::error::{CodeAssistantError, Result};
use crate::providers::{create_provider, Provider};
use crate::session::{store, Step, StepRecord, StepRecorder};
use crate::tools::{
    code_edit, colorize_diff, restore_snapshots, snapshot, CodeModifier, Modification,
    PathValidator,
};

use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Options of a `code` invocation
#[derive(Debug, Clone, Default)]
pub struct CodeOptions {
    pub prompt: String,
    pub files: Vec<PathBuf>,
    pub per_file: bool,
    pub dry_run: bool,
    pub revise: bool,
    pub store_summary: bool,
    pub max_file_size: u64,
}

impl CodeOptions {
    /// Options for `prompt` on `files` with limits taken from `config`
    pub fn new(prompt: impl Into<String>, files: Vec<PathBuf>, config: &Config) -> Self {
        Self {
            prompt: prompt.into(),
            files,
            store_summary: config.code.store_summary,
            max_file_size: config.code.max_file_size,
            ..Default::default()
        }
    }
}

/// Run `code` with the provider described by `config`
///
/// Returns the recorded step, or `None` for a dry run.
///
/// # Errors
///
/// Returns a configuration error before any file is read if the provider
/// settings are invalid, otherwise see [`run_code_with_provider`]
pub async fn run_code(dir: &Path, config: &Config, options: &CodeOptions) -> Result<Option<Step>> {
    let llm = config.llm.clone().with_defaults();
    llm.validate()?;
    let provider = create_provider(&llm)?;
    run_code_with_provider(dir, provider.as_ref(), options).await
}

/// Run `code` against an already constructed provider
///
/// # Errors
///
/// Returns error if no session is active, a path is rejected, the provider
/// fails, or the step cannot be recorded. Files written before the failure
/// are restored.
pub async fn run_code_with_provider(
    dir: &Path,
    provider: &dyn Provider,
    options: &CodeOptions,
) -> Result<Option<Step>> {
    let session = store::load(dir)?;
    if options.revise && options.dry_run {
        return Err(CodeAssistantError::InvalidInput(
            "--revise cannot be combined with --dry-run".to_string(),
        )
        .into());
    }

    let validator = PathValidator::new(dir.to_path_buf());
    let requested = validator.validate_all(&options.files)?;

    let (files, revised_snapshots) = if options.revise {
        let last = session.last_step().ok_or_else(|| {
            CodeAssistantError::InvalidInput("there is no step to revise".to_string())
        })?;
        tracing::info!("Revising step {}", last.id);
        let mut files = last.command.applied_files.clone();
        for path in requested {
            if !files.contains(&path) {
                files.push(path);
            }
        }
        (files, Some(last.snapshots.clone()))
    } else {
        (requested, None)
    };

    if files.is_empty() {
        return Err(
            CodeAssistantError::InvalidInput("no files given, use -f <FILE>".to_string()).into(),
        );
    }

    let before = snapshot(&files).await?;
    let outcome = modify_and_record(dir, provider, options, &files, revised_snapshots).await;
    if outcome.is_err() {
        if let Err(restore_err) = restore_snapshots(&before).await {
            tracing::error!("Failed to restore files after error: {:#}", restore_err);
        }
    }
    outcome
}

async fn modify_and_record(
    dir: &Path,
    provider: &dyn Provider,
    options: &CodeOptions,
    files: &[PathBuf],
    revised_snapshots: Option<BTreeMap<PathBuf, Option<String>>>,
) -> Result<Option<Step>> {
    let step_snapshots = match revised_snapshots {
        Some(mut previous) => {
            restore_snapshots(&previous).await?;
            let current = snapshot(files).await?;
            for (path, contents) in current {
                previous.entry(path).or_insert(contents);
            }
            previous.retain(|path, _| files.contains(path));
            previous
        }
        None => snapshot(files).await?,
    };

    let mut modifier = CodeModifier::new(provider);
    if options.max_file_size > 0 {
        modifier = modifier.with_max_file_size(options.max_file_size);
    }
    let modifications = modifier
        .modify(&options.prompt, files, options.per_file)
        .await?;

    if options.dry_run {
        print_dry_run(dir, &modifications);
        return Ok(None);
    }

    let files_diff = code_edit::apply(&modifications).await?;

    let summary = if options.store_summary {
        match modifier.summarize(&options.prompt, &modifications).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Could not generate step summary: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let record = StepRecord::new(options.prompt.clone(), files.to_vec())
        .with_flag("per_file", options.per_file)
        .with_flag("revise", options.revise)
        .with_files_diff(files_diff)
        .with_snapshots(step_snapshots)
        .with_summary(summary);
    let step = StepRecorder::new(dir).record(record)?;

    println!(
        "{} {}",
        format!("Recorded step {}", step.id).green().bold(),
        if options.revise { "(revision)" } else { "" }
    );
    if step.files_diff.is_empty() {
        println!("  {}", "No files changed".dimmed());
    } else {
        print_files_diff(dir, &step.files_diff);
    }
    if let Some(summary) = &step.summary {
        println!("  Summary: {}", summary);
    }
    Ok(Some(step))
}

fn print_dry_run(dir: &Path, modifications: &[Modification]) {
    println!("{}", "Dry run: no files were changed".yellow().bold());
    for modification in modifications {
        let shown = display_path(dir, &modification.path);
        if modification.is_changed() {
            println!("\n{}", shown.bold());
            println!("{}", colorize_diff(&modification.diff()));
        } else {
            println!("\n{} {}", shown.bold(), "(no changes)".dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use crate::test_utils::{create_test_file, temp_session, ScriptedProvider};

    fn options(prompt: &str, files: Vec<PathBuf>) -> CodeOptions {
        CodeOptions {
            prompt: prompt.to_string(),
            files,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_code_writes_file_and_records_step() {
        let (dir, _) = temp_session("code");
        let file = create_test_file(&dir, "main.rs", "fn main() {}\n");
        let provider = ScriptedProvider::new(vec!["fn main() {\n    println!(\"hi\");\n}\n"]);

        let options = options("say hi", vec![file.clone()]);
        let step = run_code_with_provider(dir.path(), &provider, &options)
            .await
            .unwrap()
            .unwrap();

        let canonical = file.canonicalize().unwrap();
        assert_eq!(step.id, 1);
        assert_eq!(step.command.applied_files, vec![canonical.clone()]);
        assert_eq!(step.files_diff.modified, vec![canonical.clone()]);
        assert_eq!(step.snapshots[&canonical].as_deref(), Some("fn main() {}\n"));
        assert!(std::fs::read_to_string(&file).unwrap().contains("println!"));
        assert_eq!(store::load(dir.path()).unwrap().steps.len(), 1);
    }

    #[tokio::test]
    async fn test_code_dry_run_changes_nothing() {
        let (dir, _) = temp_session("dry");
        let file = create_test_file(&dir, "a.txt", "old\n");
        let provider = ScriptedProvider::new(vec!["new\n"]);
        let mut opts = options("change", vec![file.clone()]);
        opts.dry_run = true;

        let step = run_code_with_provider(dir.path(), &provider, &opts).await.unwrap();
        assert!(step.is_none());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "old\n");
        assert!(store::load(dir.path()).unwrap().steps.is_empty());
    }

    #[tokio::test]
    async fn test_code_requires_session() {
        let dir = crate::test_utils::temp_dir();
        let provider = ScriptedProvider::new(vec!["x"]);
        let err = run_code_with_provider(dir.path(), &provider, &options("p", vec!["a".into()]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SessionError>(),
            Some(SessionError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_code_rejects_path_outside_dir() {
        let (dir, _) = temp_session("escape");
        let provider = ScriptedProvider::new(vec!["x"]);
        let err = run_code_with_provider(
            dir.path(),
            &provider,
            &options("p", vec![PathBuf::from("../outside.txt")]),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::tools::PathError>(),
            Some(crate::tools::PathError::OutsideWorkingDir(_))
        ));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_code_restores_files_when_recording_fails() {
        let (dir, _) = temp_session("restore");
        let file = create_test_file(&dir, "a.txt", "original\n");
        let provider = ScriptedProvider::new(vec!["changed\n"]);

        // A directory at the temp path makes the session save fail.
        let tmp = store::session_file_path(dir.path()).with_extension("json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        let options = options("p", vec![file.clone()]);
        let result = run_code_with_provider(dir.path(), &provider, &options).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "original\n");
    }

    #[tokio::test]
    async fn test_code_creates_new_file() {
        let (dir, _) = temp_session("create");
        let provider = ScriptedProvider::new(vec!["```\nhello\n```"]);
        let step = run_code_with_provider(
            dir.path(),
            &provider,
            &options("write hello", vec![PathBuf::from("docs/hello.txt")]),
        )
        .await
        .unwrap()
        .unwrap();

        let created = dir.path().join("docs/hello.txt");
        assert_eq!(std::fs::read_to_string(&created).unwrap(), "hello\n");
        assert_eq!(step.files_diff.created.len(), 1);
        assert_eq!(step.snapshots.values().next(), Some(&None));
    }

    #[tokio::test]
    async fn test_code_stores_summary() {
        let (dir, _) = temp_session("summary");
        let file = create_test_file(&dir, "a.txt", "a\n");
        let provider = ScriptedProvider::new(vec!["b\n", "Replace a with b."]);
        let mut opts = options("swap", vec![file]);
        opts.store_summary = true;

        let step = run_code_with_provider(dir.path(), &provider, &opts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(step.summary.as_deref(), Some("Replace a with b"));
    }

    #[tokio::test]
    async fn test_code_summary_failure_still_records() {
        let (dir, _) = temp_session("summary-fail");
        let file = create_test_file(&dir, "a.txt", "a\n");
        let provider = ScriptedProvider::new(vec!["b\n"]);
        let mut opts = options("swap", vec![file]);
        opts.store_summary = true;

        let step = run_code_with_provider(dir.path(), &provider, &opts)
            .await
            .unwrap()
            .unwrap();
        assert!(step.summary.is_none());
    }

    #[tokio::test]
    async fn test_code_revise_restarts_from_previous_contents() {
        let (dir, _) = temp_session("revise");
        let a = create_test_file(&dir, "a.txt", "v0\n");
        let b = create_test_file(&dir, "b.txt", "b0\n");
        let provider = ScriptedProvider::new(vec!["v1\n", "v2\n", "b1\n"]);

        run_code_with_provider(dir.path(), &provider, &options("first", vec![a.clone()]))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "v1\n");

        let mut opts = options("second", vec![b.clone()]);
        opts.revise = true;
        opts.per_file = true;
        let step = run_code_with_provider(dir.path(), &provider, &opts)
            .await
            .unwrap()
            .unwrap();

        let (a_abs, b_abs) = (a.canonicalize().unwrap(), b.canonicalize().unwrap());
        assert_eq!(step.id, 2);
        assert!(step.command.flag("revise"));
        assert_eq!(step.command.applied_files, vec![a_abs.clone(), b_abs.clone()]);
        assert_eq!(step.snapshots[&a_abs].as_deref(), Some("v0\n"));
        assert_eq!(step.snapshots[&b_abs].as_deref(), Some("b0\n"));
        assert!(provider.prompts()[1].contains("v0"));
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "v2\n");
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "b1\n");
    }

    #[tokio::test]
    async fn test_code_revise_failure_restores_current_contents() {
        let (dir, _) = temp_session("revise-fail");
        let a = create_test_file(&dir, "a.txt", "v0\n");
        let provider = ScriptedProvider::new(vec!["v1\n"]);

        run_code_with_provider(dir.path(), &provider, &options("first", vec![a.clone()]))
            .await
            .unwrap();

        let mut opts = options("second", vec![]);
        opts.revise = true;
        let result = run_code_with_provider(dir.path(), &provider, &opts).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&a).unwrap(), "v1\n");
        assert_eq!(store::load(dir.path()).unwrap().steps.len(), 1);
    }

    #[tokio::test]
    async fn test_code_revise_without_steps_fails() {
        let (dir, _) = temp_session("nothing");
        let provider = ScriptedProvider::new(vec![]);
        let mut opts = options("p", vec![]);
        opts.revise = true;
        assert!(run_code_with_provider(dir.path(), &provider, &opts).await.is_err());
    }

    #[tokio::test]
    async fn test_run_code_validates_provider_settings() {
        let (dir, _) = temp_session("no-key");
        let file = create_test_file(&dir, "a.txt", "a\n");
        let config = Config::default();
        let opts = CodeOptions::new("p", vec![file], &config);

        let err = run_code(dir.path(), &config, &opts).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodeAssistantError>(),
            Some(CodeAssistantError::MissingCredentials(_))
        ));
    }
}
