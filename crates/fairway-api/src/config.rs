use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fairway_core::store::{
    normalize_snapshot_key, FilesystemSnapshotStore, MemorySnapshotStore, R2Config,
    R2SnapshotStore, SnapshotBackend, DEFAULT_SNAPSHOT_KEY,
};
use fairway_core::sync::DEFAULT_MAX_SNAPSHOT_BYTES;
use fairway_core::SyncSettings;
use thiserror::Error;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Snapshot store setup failed: {0}")]
    Store(#[from] fairway_core::Error),
}

/// Where the snapshot document lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Filesystem,
    R2,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "filesystem" | "fs" => Ok(Self::Filesystem),
            "r2" => Ok(Self::R2),
            _ => Err(ConfigError::Invalid(format!(
                "FAIRWAY_STORE must be one of memory, filesystem, r2 (got `{value}`)"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub store: StoreKind,
    pub data_dir: PathBuf,
    pub snapshot_key: String,
    pub max_snapshot_bytes: usize,
    pub tombstone_retention: Duration,
    pub site_write_key: Option<String>,
    pub r2: Option<R2Config>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("store", &self.store)
            .field("data_dir", &self.data_dir)
            .field("snapshot_key", &self.snapshot_key)
            .field("max_snapshot_bytes", &self.max_snapshot_bytes)
            .field("tombstone_retention", &self.tombstone_retention)
            .field(
                "site_write_key",
                &self.site_write_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("r2", &self.r2)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "FAIRWAY_API_BIND_ADDR", "127.0.0.1:8080");
        let store = value_or_default(&lookup, "FAIRWAY_STORE", "filesystem").parse::<StoreKind>()?;
        let data_dir = PathBuf::from(value_or_default(&lookup, "FAIRWAY_DATA_DIR", "./data"));

        let snapshot_key = normalize_snapshot_key(&value_or_default(
            &lookup,
            "FAIRWAY_SNAPSHOT_KEY",
            DEFAULT_SNAPSHOT_KEY,
        ))
        .map_err(|error| ConfigError::Invalid(format!("FAIRWAY_SNAPSHOT_KEY: {error}")))?;

        let default_max_bytes = DEFAULT_MAX_SNAPSHOT_BYTES.to_string();
        let max_snapshot_bytes =
            value_or_default(&lookup, "FAIRWAY_MAX_SNAPSHOT_BYTES", &default_max_bytes)
                .parse::<usize>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "FAIRWAY_MAX_SNAPSHOT_BYTES must be an integer in [1024, 67108864]"
                            .to_string(),
                    )
                })?;
        if !(1_024..=67_108_864).contains(&max_snapshot_bytes) {
            return Err(ConfigError::Invalid(
                "FAIRWAY_MAX_SNAPSHOT_BYTES must be in [1024, 67108864]".to_string(),
            ));
        }

        let retention_days = value_or_default(&lookup, "FAIRWAY_TOMBSTONE_RETENTION_DAYS", "30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "FAIRWAY_TOMBSTONE_RETENTION_DAYS must be an integer in [1, 365]".to_string(),
                )
            })?;
        if !(1..=365).contains(&retention_days) {
            return Err(ConfigError::Invalid(
                "FAIRWAY_TOMBSTONE_RETENTION_DAYS must be in [1, 365]".to_string(),
            ));
        }

        let site_write_key = optional_trimmed(&lookup, "FAIRWAY_SITE_WRITE_KEY");

        let r2 = R2Config::from_lookup(&lookup)
            .map_err(|error| ConfigError::Invalid(error.to_string()))?;
        if store == StoreKind::R2 && r2.is_none() {
            return Err(ConfigError::MissingVar("R2_ACCOUNT_ID"));
        }

        Ok(Self {
            bind_addr,
            store,
            data_dir,
            snapshot_key,
            max_snapshot_bytes,
            tombstone_retention: Duration::from_secs(retention_days * SECONDS_PER_DAY),
            site_write_key,
            r2,
        })
    }

    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            max_snapshot_bytes: self.max_snapshot_bytes,
            tombstone_retention: self.tombstone_retention,
        }
    }

    /// Open the configured snapshot backend.
    pub async fn open_store(&self) -> Result<SnapshotBackend, ConfigError> {
        let backend = match self.store {
            StoreKind::Memory => SnapshotBackend::Memory(MemorySnapshotStore::new()),
            StoreKind::Filesystem => SnapshotBackend::Filesystem(
                FilesystemSnapshotStore::open(&self.data_dir, &self.snapshot_key).await?,
            ),
            StoreKind::R2 => {
                let config = self.r2.clone().ok_or(ConfigError::MissingVar("R2_ACCOUNT_ID"))?;
                SnapshotBackend::R2(R2SnapshotStore::new(config, &self.snapshot_key)?)
            }
        };
        Ok(backend)
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    fairway_core::util::normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&HashMap::new()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.store, StoreKind::Filesystem);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.snapshot_key, "storage");
        assert_eq!(config.max_snapshot_bytes, 1_048_576);
        assert_eq!(
            config.tombstone_retention,
            Duration::from_secs(30 * SECONDS_PER_DAY)
        );
        assert!(config.site_write_key.is_none());
        assert!(config.r2.is_none());
    }

    #[test]
    fn limits_are_range_checked() {
        let mut map = HashMap::new();
        map.insert("FAIRWAY_MAX_SNAPSHOT_BYTES", "512");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("FAIRWAY_MAX_SNAPSHOT_BYTES"));

        let mut map = HashMap::new();
        map.insert("FAIRWAY_TOMBSTONE_RETENTION_DAYS", "0");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("FAIRWAY_TOMBSTONE_RETENTION_DAYS"));
    }

    #[test]
    fn unknown_store_is_rejected() {
        let mut map = HashMap::new();
        map.insert("FAIRWAY_STORE", "postgres");
        assert!(config_from(&map).is_err());
    }

    #[test]
    fn r2_store_requires_r2_credentials() {
        let mut map = HashMap::new();
        map.insert("FAIRWAY_STORE", "r2");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("R2_ACCOUNT_ID"));

        map.insert("R2_ACCOUNT_ID", "acc");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("R2_BUCKET"));
    }

    #[test]
    fn snapshot_key_must_be_plain_name() {
        let mut map = HashMap::new();
        map.insert("FAIRWAY_SNAPSHOT_KEY", "../storage");
        let err = config_from(&map).unwrap_err();
        assert!(err.to_string().contains("FAIRWAY_SNAPSHOT_KEY"));
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let mut map = HashMap::new();
        map.insert("FAIRWAY_STORE", "r2");
        map.insert("FAIRWAY_SITE_WRITE_KEY", "sensitive-site-key");
        map.insert("R2_ACCOUNT_ID", "acc");
        map.insert("R2_BUCKET", "bucket");
        map.insert("R2_ACCESS_KEY_ID", "access");
        map.insert("R2_SECRET_ACCESS_KEY", "sensitive-r2-secret");

        let config = config_from(&map).unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-site-key"));
        assert!(!debug_output.contains("sensitive-r2-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn open_store_builds_filesystem_backend_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("snapshots");
        let data_dir_text = data_dir.to_string_lossy().into_owned();
        let mut map = HashMap::new();
        map.insert("FAIRWAY_DATA_DIR", data_dir_text.as_str());

        let config = config_from(&map).unwrap();
        let store = config.open_store().await.unwrap();

        match store {
            SnapshotBackend::Filesystem(store) => {
                assert_eq!(store.path(), data_dir.join("storage.json"));
            }
            other => panic!("unexpected backend: {other:?}"),
        }
    }
}
