//! Fairway CLI - operator tooling for the shared course snapshot
//!
//! Talks to a running fairway-api for fetch/push, and works directly on
//! snapshot files for offline merges, tombstone GC and inspection.

mod cli;
mod client;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::sync_client;
use crate::commands::fetch::run_fetch;
use crate::commands::gc::run_gc;
use crate::commands::merge::run_merge;
use crate::commands::push::run_push;
use crate::commands::stats::{run_stats_local, run_stats_remote};
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

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "fairway=warn"
            .parse()
            .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { output } => {
            let client = sync_client(cli.server, cli.key)?;
            run_fetch(&client, output.as_deref()).await?;
        }
        Commands::Push {
            deltas,
            base_version,
            output,
        } => {
            let client = sync_client(cli.server, cli.key)?;
            run_push(&client, &deltas, base_version, output.as_deref()).await?;
        }
        Commands::Merge {
            snapshot,
            deltas,
            output,
            max_bytes,
        } => run_merge(&snapshot, &deltas, output.as_deref(), max_bytes).await?,
        Commands::Gc {
            store,
            retention_days,
            dry_run,
        } => run_gc(&store, retention_days, dry_run).await?,
        Commands::Stats { local, store, json } => {
            if local {
                run_stats_local(&store, json).await?;
            } else {
                let client = sync_client(cli.server, cli.key)?;
                run_stats_remote(&client, json).await?;
            }
        }
    }

    Ok(())
}
