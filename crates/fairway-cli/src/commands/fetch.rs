use std::path::Path;

use crate::client::SyncClient;
use crate::commands::common::write_snapshot;
use crate::error::CliError;

pub async fn run_fetch(client: &SyncClient, output: Option<&Path>) -> Result<(), CliError> {
    let snapshot = client.fetch().await?;
    tracing::debug!(url = client.snapshot_url(), version = snapshot.version, "Fetched snapshot");
    write_snapshot(&snapshot, output).await
}
