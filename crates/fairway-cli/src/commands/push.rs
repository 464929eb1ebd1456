use std::path::Path;

use fairway_core::SyncRequest;

use crate::client::{PushOutcome, SyncClient};
use crate::commands::common::{has_base_version, read_json_file, with_base_version, write_snapshot};
use crate::error::CliError;

pub async fn run_push(
    client: &SyncClient,
    deltas_path: &Path,
    base_version: Option<u64>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let deltas = read_json_file(deltas_path).await?;

    // Without an explicit base, push against whatever the server holds now.
    let fallback = if base_version.is_none() && !has_base_version(&deltas) {
        Some(client.fetch().await?.version)
    } else {
        None
    };
    let request = SyncRequest::from_value(with_base_version(deltas, base_version, fallback))?;
    if request.deltas.is_empty() {
        println!("Delta file contains no records; pushing to advance the version only");
    }

    match client.push(&request).await? {
        PushOutcome::Accepted(snapshot) => {
            println!(
                "Pushed {} -> version {}",
                deltas_path.display(),
                snapshot.version
            );
            if output.is_some() {
                write_snapshot(&snapshot, output).await?;
            }
            Ok(())
        }
        PushOutcome::Conflict {
            current_version,
            server_snapshot,
        } => {
            tracing::warn!(
                base_version = request.base_version,
                current_version,
                bookings = server_snapshot.bookings.len(),
                "Server rejected push"
            );
            Err(CliError::Conflict { current_version })
        }
    }
}
