use std::time::Duration;

use fairway_core::store::{
    FilesystemSnapshotStore, SnapshotStore, WriteOutcome, WritePrecondition,
};
use fairway_core::sync::{EncodedSnapshot, MergeReport};
use fairway_core::{EntityKind, ManualClock, Snapshot};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;

use crate::client::{normalize_server_url, parse_api_error, SyncClient};
use crate::commands::common::{format_report_lines, format_stats_lines, with_base_version};
use crate::commands::gc::prune_store;
use crate::commands::merge::merge_files;
use crate::error::CliError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[test]
fn normalize_server_url_requires_http_scheme() {
    assert_eq!(
        normalize_server_url(" https://ops.example.com/ ".to_string()).unwrap(),
        "https://ops.example.com"
    );
    assert!(normalize_server_url("ops.example.com".to_string()).is_err());
    assert!(normalize_server_url("   ".to_string()).is_err());
}

#[test]
fn sync_client_targets_snapshot_endpoint() {
    let client = SyncClient::new("http://127.0.0.1:8080/", Some("  ".to_string())).unwrap();
    assert_eq!(client.snapshot_url(), "http://127.0.0.1:8080/v1/snapshot");
}

#[test]
fn parse_api_error_prefers_message_and_appends_suggestion() {
    let body = r#"{"error":"Data too large","message":"Data size 1200KB exceeds 1024KB limit","suggestion":"Archive old bookings or reduce data volume"}"#;
    assert_eq!(
        parse_api_error(StatusCode::PAYLOAD_TOO_LARGE, body),
        "Data size 1200KB exceeds 1024KB limit (413). Archive old bookings or reduce data volume"
    );
    assert_eq!(
        parse_api_error(StatusCode::UNAUTHORIZED, r#"{"error":"Unauthorized"}"#),
        "Unauthorized (401)"
    );
    assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
}

#[test]
fn base_version_resolution_order() {
    let explicit = with_base_version(json!({"baseVersion": 1}), Some(4), Some(9));
    assert_eq!(explicit["baseVersion"], 4);

    let from_file = with_base_version(json!({"baseVersion": 1}), None, Some(9));
    assert_eq!(from_file["baseVersion"], 1);

    let fallback = with_base_version(json!({"bookings": []}), None, Some(9));
    assert_eq!(fallback["baseVersion"], 9);
}

#[test]
fn stats_lines_list_every_collection() {
    let mut snapshot = Snapshot::empty(0);
    snapshot.version = 12;
    let lines = format_stats_lines(&snapshot.stats());
    assert_eq!(lines.len(), EntityKind::ALL.len() + 2);
    assert_eq!(lines[0], "version           12");
}

#[test]
fn empty_report_says_no_changes() {
    assert_eq!(
        format_report_lines(&MergeReport::default()),
        vec!["No changes".to_string()]
    );
}

#[tokio::test]
async fn offline_merge_applies_deltas_and_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("storage.json");
    let deltas_path = dir.path().join("deltas.json");

    let seed = json!({
        "bookings": [{"id": "B1", "updatedAt": 10}],
        "caddies": [{"id": "C1", "bookingId": "B1", "updatedAt": 10}],
        "version": 3,
        "updatedAt": 10
    });
    std::fs::write(&snapshot_path, seed.to_string()).unwrap();
    std::fs::write(
        &deltas_path,
        json!({"bookings": [{"id": "B1", "deleted": true}]}).to_string(),
    )
    .unwrap();

    let clock = ManualClock::new(1_000);
    let (merged, report) = merge_files(&snapshot_path, &deltas_path, 1_048_576, &clock)
        .await
        .unwrap();

    assert_eq!(merged.version, 4);
    assert!(merged.bookings.is_empty());
    assert!(merged.caddies.is_empty());
    assert_eq!(report.cascade.cascaded, 1);
    assert!(format_report_lines(&report)
        .iter()
        .any(|line| line == "integrity: 1 cascaded, 0 orphaned"));
}

#[tokio::test]
async fn offline_merge_rejects_stale_base_version() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("storage.json");
    let deltas_path = dir.path().join("deltas.json");
    std::fs::write(&snapshot_path, json!({"version": 5}).to_string()).unwrap();
    std::fs::write(&deltas_path, json!({"baseVersion": 4}).to_string()).unwrap();

    let error = merge_files(&snapshot_path, &deltas_path, 1_048_576, &ManualClock::new(0))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CliError::Conflict {
            current_version: 5
        }
    ));
}

#[tokio::test]
async fn offline_merge_starts_from_empty_when_snapshot_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let deltas_path = dir.path().join("deltas.json");
    std::fs::write(
        &deltas_path,
        json!({"waitlist": [{"id": "W1", "bookingId": "B404"}]}).to_string(),
    )
    .unwrap();

    let (merged, report) = merge_files(
        &dir.path().join("missing.json"),
        &deltas_path,
        1_048_576,
        &ManualClock::new(0),
    )
    .await
    .unwrap();

    assert_eq!(merged.version, 1);
    assert!(merged.waitlist.is_empty());
    assert_eq!(report.cascade.orphaned, 1);
}

#[tokio::test]
async fn offline_merge_enforces_size_limit() {
    let dir = tempfile::tempdir().unwrap();
    let deltas_path = dir.path().join("deltas.json");
    std::fs::write(
        &deltas_path,
        json!({"bookings": [{"id": "B1", "notes": "x".repeat(2_048)}]}).to_string(),
    )
    .unwrap();

    let error = merge_files(
        &dir.path().join("storage.json"),
        &deltas_path,
        1_024,
        &ManualClock::new(0),
    )
    .await
    .unwrap_err();

    match error {
        CliError::TooLarge(message) => assert!(message.ends_with("exceeds 1KB limit")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn gc_prunes_expired_tombstones_and_keeps_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemSnapshotStore::open(dir.path(), "storage")
        .await
        .unwrap();
    let now = 90 * DAY_MS;
    let mut snapshot = Snapshot::empty(now);
    snapshot.version = 7;
    snapshot
        .tombstones
        .record_deletion(EntityKind::Bookings, "OLD", now - 40 * DAY_MS);
    snapshot
        .tombstones
        .record_deletion(EntityKind::Bookings, "NEW", now - DAY_MS);
    store
        .save(
            EncodedSnapshot {
                version: 7,
                bytes: snapshot.to_bytes().unwrap(),
            },
            WritePrecondition::DoesNotExist,
        )
        .await
        .unwrap();

    let clock = ManualClock::new(now);
    let retention = Duration::from_secs(30 * 24 * 60 * 60);

    let would_remove = prune_store(&store, retention, &clock, true).await.unwrap();
    assert_eq!(would_remove, 1);
    assert_eq!(store.load().await.unwrap().unwrap().snapshot.tombstones.len(), 2);

    let removed = prune_store(&store, retention, &clock, false).await.unwrap();
    assert_eq!(removed, 1);
    let stored = store.load().await.unwrap().unwrap().snapshot;
    assert_eq!(stored.version, 7);
    assert!(stored.tombstones.get(EntityKind::Bookings, "OLD").is_none());
    assert!(stored.tombstones.get(EntityKind::Bookings, "NEW").is_some());
}

#[tokio::test]
async fn gc_on_empty_store_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemSnapshotStore::open(dir.path(), "storage")
        .await
        .unwrap();
    let removed = prune_store(
        &store,
        Duration::from_secs(60),
        &ManualClock::new(0),
        false,
    )
    .await
    .unwrap();
    assert_eq!(removed, 0);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn push_loaded_before_gc_cannot_overwrite_the_prune() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilesystemSnapshotStore::open(dir.path(), "storage")
        .await
        .unwrap();
    let now = 90 * DAY_MS;
    let mut snapshot = Snapshot::empty(now);
    snapshot.version = 7;
    snapshot
        .tombstones
        .record_deletion(EntityKind::Bookings, "OLD", now - 40 * DAY_MS);
    store
        .save(
            EncodedSnapshot {
                version: 7,
                bytes: snapshot.to_bytes().unwrap(),
            },
            WritePrecondition::DoesNotExist,
        )
        .await
        .unwrap();

    let loaded_by_push = store.load().await.unwrap().unwrap();
    let retention = Duration::from_secs(30 * 24 * 60 * 60);
    let removed = prune_store(&store, retention, &ManualClock::new(now), false)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let mut pushed = loaded_by_push.snapshot.clone();
    pushed.version = 8;
    let outcome = store
        .save(
            EncodedSnapshot {
                version: 8,
                bytes: pushed.to_bytes().unwrap(),
            },
            WritePrecondition::for_loaded(Some(&loaded_by_push)),
        )
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::PreconditionFailed);
    let stored = store.load().await.unwrap().unwrap().snapshot;
    assert_eq!(stored.version, 7);
    assert!(stored.tombstones.get(EntityKind::Bookings, "OLD").is_none());
}

#[test]
fn gc_race_message_does_not_mention_pushing() {
    assert_eq!(
        CliError::PruneRaced.to_string(),
        "Snapshot changed while pruning tombstones; nothing was removed, run gc again"
    );
}
