use fairway_core::store::SnapshotStore;
use fairway_core::Snapshot;

use crate::cli::LocalStoreArgs;
use crate::client::SyncClient;
use crate::commands::common::{format_stats_lines, open_local_store};
use crate::error::CliError;

pub async fn run_stats_remote(client: &SyncClient, as_json: bool) -> Result<(), CliError> {
    let snapshot = client.fetch().await?;
    print_stats(&snapshot, as_json)
}

pub async fn run_stats_local(store_args: &LocalStoreArgs, as_json: bool) -> Result<(), CliError> {
    let store = open_local_store(store_args).await?;
    let Some(stored) = store.load().await? else {
        println!("No snapshot stored at {}", store.path().display());
        return Ok(());
    };
    print_stats(&stored.snapshot, as_json)
}

fn print_stats(snapshot: &Snapshot, as_json: bool) -> Result<(), CliError> {
    let stats = snapshot.stats();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        for line in format_stats_lines(&stats) {
            println!("{line}");
        }
    }
    Ok(())
}
