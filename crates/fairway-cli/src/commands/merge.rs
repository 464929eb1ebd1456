use std::path::Path;

use fairway_core::sync::{apply_push, check_base_version, too_large_message, MergeReport, SizeGuard};
use fairway_core::{Clock, Snapshot, SyncRequest, SystemClock};

use crate::commands::common::{
    format_report_lines, read_json_file, read_snapshot_file, with_base_version, write_snapshot,
};
use crate::error::CliError;

pub async fn run_merge(
    snapshot_path: &Path,
    deltas_path: &Path,
    output: Option<&Path>,
    max_bytes: usize,
) -> Result<(), CliError> {
    let (merged, report) = merge_files(snapshot_path, deltas_path, max_bytes, &SystemClock).await?;

    if output.is_some() {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }
    write_snapshot(&merged, output).await
}

/// Merge a delta file into a snapshot file with the same rules the server
/// applies. A delta file without `baseVersion` is merged against whatever
/// version the snapshot file holds.
pub async fn merge_files(
    snapshot_path: &Path,
    deltas_path: &Path,
    max_bytes: usize,
    clock: &dyn Clock,
) -> Result<(Snapshot, MergeReport), CliError> {
    let snapshot = read_snapshot_file(snapshot_path).await?;
    let deltas = read_json_file(deltas_path).await?;
    let request = SyncRequest::from_value(with_base_version(deltas, None, Some(snapshot.version)))?;

    if let Err(stale) = check_base_version(request.base_version, snapshot.version) {
        return Err(CliError::Conflict {
            current_version: stale.current_version,
        });
    }

    let (merged, report) = apply_push(snapshot, request.deltas, clock);
    match SizeGuard::new(max_bytes).encode(&merged) {
        Ok(_) => Ok((merged, report)),
        Err(fairway_core::Error::PayloadTooLarge { size, limit }) => {
            Err(CliError::TooLarge(too_large_message(size, limit)))
        }
        Err(error) => Err(error.into()),
    }
}
