use std::env;
use std::io::ErrorKind;
use std::path::Path;

use fairway_core::store::FilesystemSnapshotStore;
use fairway_core::sync::MergeReport;
use fairway_core::util::normalize_text_option;
use fairway_core::{Clock, EntityKind, Snapshot, SnapshotStats, SystemClock};
use serde_json::Value;

use crate::cli::LocalStoreArgs;
use crate::client::SyncClient;
use crate::error::CliError;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

pub fn resolve_server(cli_server: Option<String>) -> String {
    normalize_text_option(cli_server)
        .or_else(|| normalize_text_option(env::var("FAIRWAY_SERVER").ok()))
        .unwrap_or_else(|| DEFAULT_SERVER.to_string())
}

pub fn resolve_key(cli_key: Option<String>) -> Option<String> {
    normalize_text_option(cli_key)
        .or_else(|| normalize_text_option(env::var("FAIRWAY_SITE_WRITE_KEY").ok()))
}

pub fn sync_client(server: Option<String>, key: Option<String>) -> Result<SyncClient, CliError> {
    Ok(SyncClient::new(resolve_server(server), resolve_key(key))?)
}

pub async fn open_local_store(args: &LocalStoreArgs) -> Result<FilesystemSnapshotStore, CliError> {
    Ok(FilesystemSnapshotStore::open(&args.data_dir, &args.snapshot_key).await?)
}

pub async fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read a snapshot file, treating a missing file as an empty snapshot.
pub async fn read_snapshot_file(path: &Path) -> Result<Snapshot, CliError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Snapshot::from_slice(&bytes)?),
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Snapshot file not found, starting empty");
            Ok(Snapshot::empty(SystemClock.now_millis()))
        }
        Err(error) => Err(error.into()),
    }
}

/// Write `snapshot` as pretty JSON to `output`, or to stdout when omitted.
pub async fn write_snapshot(snapshot: &Snapshot, output: Option<&Path>) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(snapshot)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            println!("Wrote snapshot version {} to {}", snapshot.version, path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Fill in `baseVersion` on a delta document.
///
/// An explicit version always wins; otherwise an existing `baseVersion` in
/// the document is kept and `fallback` is used only when it is absent.
pub fn with_base_version(mut deltas: Value, explicit: Option<u64>, fallback: Option<u64>) -> Value {
    if let Value::Object(body) = &mut deltas {
        match explicit {
            Some(version) => {
                body.insert("baseVersion".to_string(), Value::from(version));
            }
            None => {
                if let Some(version) = fallback {
                    body.entry("baseVersion").or_insert_with(|| Value::from(version));
                }
            }
        }
    }
    deltas
}

pub fn has_base_version(deltas: &Value) -> bool {
    deltas.get("baseVersion").is_some()
}

pub fn format_stats_lines(stats: &SnapshotStats) -> Vec<String> {
    vec![
        format!("version           {}", stats.version),
        format!("bookings          {}", stats.bookings),
        format!("user_profiles     {}", stats.user_profiles),
        format!("schedule_items    {}", stats.schedule_items),
        format!("emergency_alerts  {}", stats.emergency_alerts),
        format!("caddies           {}", stats.caddies),
        format!("waitlist          {}", stats.waitlist),
        format!("tombstones        {}", stats.tombstones),
    ]
}

pub fn format_report_lines(report: &MergeReport) -> Vec<String> {
    let mut lines: Vec<String> = EntityKind::ALL
        .iter()
        .filter_map(|kind| report.collections.get(kind).map(|stats| (kind, stats)))
        .filter(|(_, stats)| {
            stats.upserted + stats.tombstoned + stats.rejected + stats.kept_existing + stats.purged
                > 0
        })
        .map(|(kind, stats)| {
            format!(
                "{kind}: {} upserted, {} deleted, {} rejected, {} kept newer, {} purged",
                stats.upserted, stats.tombstoned, stats.rejected, stats.kept_existing, stats.purged
            )
        })
        .collect();
    if report.cascade.total() > 0 {
        lines.push(format!(
            "integrity: {} cascaded, {} orphaned",
            report.cascade.cascaded, report.cascade.orphaned
        ));
    }
    if lines.is_empty() {
        lines.push("No changes".to_string());
    }
    lines
}
