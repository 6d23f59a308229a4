//! ca - AI coding assistant CLI
//!
#![doc = "Main entry point for the ca binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use codeassistant::cli::{Cli, Commands};
use codeassistant::commands::{self, CodeOptions};
use codeassistant::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(".ca.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let working_dir = std::env::current_dir()?;

    match cli.command {
        Commands::StartSession { name } => {
            commands::start_session(&working_dir, &name)?;
        }
        Commands::Code {
            prompt,
            files,
            per_file,
            dry_run,
            revise,
        } => {
            tracing::info!("Running code command on {} file(s)", files.len());
            let options = CodeOptions {
                per_file,
                dry_run,
                revise,
                ..CodeOptions::new(prompt, files, &config)
            };
            commands::run_code(&working_dir, &config, &options).await?;
        }
        Commands::Review { diff, step } => {
            commands::run_review(&working_dir, diff, step).await?;
        }
        Commands::Rollback { step } => {
            commands::run_rollback(&working_dir, step).await?;
        }
        Commands::EndSession => {
            commands::end_session(&working_dir)?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "codeassistant=debug,ca=debug"
    } else {
        "codeassistant=info,ca=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
