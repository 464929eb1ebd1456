//! Cloudflare R2 (S3-compatible) snapshot store.

use std::env;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use super::{
    normalize_snapshot_key, Revision, SnapshotStore, StoredSnapshot, WriteOutcome,
    WritePrecondition,
};
use crate::models::Snapshot;
use crate::sync::EncodedSnapshot;
use crate::{Error, Result};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";

/// Cloudflare R2 configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`R2Config::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        parse_config(lookup)
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// Keeps the snapshot as a single JSON object in an R2 bucket.
///
/// The revision is the object's `ETag`; writes use `If-Match` (or
/// `If-None-Match: *` for the first write) so a concurrent writer that got
/// there first makes the request fail with 412 instead of being overwritten.
#[derive(Clone, Debug)]
pub struct R2SnapshotStore {
    config: R2Config,
    object_key: String,
    client: Client,
}

impl R2SnapshotStore {
    pub fn new(config: R2Config, key: &str) -> Result<Self> {
        let object_key = format!("{}.json", normalize_snapshot_key(key)?);
        let client = build_s3_client(&config);
        Ok(Self {
            config,
            object_key,
            client,
        })
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }
}

impl SnapshotStore for R2SnapshotStore {
    fn kind(&self) -> &'static str {
        "r2"
    }

    async fn load(&self) -> Result<Option<StoredSnapshot>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&self.object_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key) =>
            {
                return Ok(None);
            }
            Err(error) => {
                return Err(storage_error(
                    "get_object",
                    &self.config.bucket,
                    &self.object_key,
                    error,
                ));
            }
        };

        let revision = response
            .e_tag()
            .map(Revision::new)
            .ok_or_else(|| Error::Storage("R2 get_object returned no ETag".to_string()))?;

        let payload = response.body.collect().await.map_err(|error| {
            storage_error(
                "get_object_body",
                &self.config.bucket,
                &self.object_key,
                error,
            )
        })?;

        Ok(Some(StoredSnapshot {
            snapshot: Snapshot::from_slice(&payload.into_bytes())?,
            revision,
        }))
    }

    async fn save(
        &self,
        document: EncodedSnapshot,
        precondition: WritePrecondition,
    ) -> Result<WriteOutcome> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&self.object_key)
            .content_type("application/json")
            .body(ByteStream::from(document.bytes));

        request = match &precondition {
            WritePrecondition::DoesNotExist => request.if_none_match("*"),
            WritePrecondition::MatchesRevision(revision) => request.if_match(revision.as_str()),
        };

        match request.send().await {
            Ok(response) => {
                let revision = response
                    .e_tag()
                    .map(Revision::new)
                    .ok_or_else(|| Error::Storage("R2 put_object returned no ETag".to_string()))?;
                Ok(WriteOutcome::Written { revision })
            }
            Err(error) if is_precondition_failure(&error) => {
                tracing::warn!(
                    bucket = %self.config.bucket,
                    key = %self.object_key,
                    ?precondition,
                    "R2 conditional write rejected"
                );
                Ok(WriteOutcome::PreconditionFailed)
            }
            Err(error) => Err(storage_error(
                "put_object",
                &self.config.bucket,
                &self.object_key,
                error,
            )),
        }
    }
}

/// 412 for a failed `If-Match`/`If-None-Match`; 409 when another conditional
/// write to the same key is in flight.
fn is_precondition_failure<E>(error: &SdkError<E, HttpResponse>) -> bool {
    error
        .raw_response()
        .is_some_and(|response| matches!(response.status().as_u16(), 409 | 412))
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let account_id = lookup(ENV_ACCOUNT_ID).map(|value| value.trim().to_string());
    let bucket = lookup(ENV_BUCKET).map(|value| value.trim().to_string());
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).map(|value| value.trim().to_string());
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).map(|value| value.trim().to_string());

    let any_present = account_id.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    let mut required = |name: &'static str, value: Option<String>| {
        let value = value.filter(|value| !value.is_empty());
        if value.is_none() {
            missing.push(name);
        }
        value.unwrap_or_default()
    };
    let account_id = required(ENV_ACCOUNT_ID, account_id);
    let bucket = required(ENV_BUCKET, bucket);
    let access_key_id = required(ENV_ACCESS_KEY_ID, access_key_id);
    let secret_access_key = required(ENV_SECRET_ACCESS_KEY, secret_access_key);

    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    Ok(Some(R2Config {
        account_id,
        bucket,
        access_key_id,
        secret_access_key,
    }))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "fairway-core-r2-store",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: &str,
    error: impl std::fmt::Display,
) -> Error {
    Error::Storage(format!(
        "R2 {operation} failed for {bucket}/{object_key}: {error}"
    ))
}
