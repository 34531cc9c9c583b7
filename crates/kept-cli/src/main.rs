//! Kept CLI - notes, files, and events from the terminal
//!
//! Works against the hosted backend when reachable and from the local cache
//! otherwise; offline changes are queued until `kept sync`.

mod cli;
mod commands;
mod config_profiles;
mod error;
#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::GlobalOptions;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::events::run_events;
use crate::commands::files::run_files;
use crate::commands::notes::run_notes;
use crate::commands::sync::{run_queue, run_reset, run_status, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["kept=info", "kept_core=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = GlobalOptions {
        db_path: cli.db_path,
        profile: cli.profile,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Notes { command } => run_notes(command, &options).await?,
        Commands::Events { command } => run_events(command, &options).await?,
        Commands::Files { command } => run_files(command, &options).await?,
        Commands::Sync => run_sync(&options).await?,
        Commands::Queue { json } => run_queue(json, &options).await?,
        Commands::Status => run_status(&options).await?,
        Commands::Reset { yes } => run_reset(yes, &options).await?,
        Commands::Config { command } => run_config(command, options.profile.as_deref())?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
