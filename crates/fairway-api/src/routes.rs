use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use fairway_core::store::{SnapshotBackend, SnapshotStore};
use fairway_core::{Snapshot, SyncRequest, SyncService};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::SiteKey;
use crate::config::{AppConfig, ConfigError};
use crate::error::AppError;

/// A push may carry a full client copy plus deletions that shrink the
/// merged result, so the transport limit sits well above the snapshot
/// ceiling. The merged snapshot is what the size guard measures.
const BODY_LIMIT_FACTOR: usize = 8;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    sync: Arc<SyncService<SnapshotBackend>>,
    site_key: Option<SiteKey>,
}

impl AppState {
    pub async fn from_config(config: Arc<AppConfig>) -> Result<Self, ConfigError> {
        let store = config.open_store().await?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Arc<AppConfig>, store: SnapshotBackend) -> Self {
        Self {
            sync: Arc::new(SyncService::new(store, config.sync_settings())),
            site_key: config.site_write_key.clone().map(SiteKey::new),
            config,
        }
    }

    fn body_limit(&self) -> usize {
        self.config
            .max_snapshot_bytes
            .saturating_mul(BODY_LIMIT_FACTOR)
    }
}

pub fn app_router(state: AppState) -> Router {
    let body_limit = state.body_limit();

    let snapshot_routes = Router::new()
        .route(
            "/snapshot",
            get(fetch_snapshot)
                .put(push_snapshot)
                .fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_site_key,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", snapshot_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    timestamp: i64,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: state.sync.store().kind(),
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_site_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(key) = &state.site_key {
        key.verify(request.headers())?;
    }
    Ok(next.run(request).await)
}

async fn fetch_snapshot(State(state): State<AppState>) -> Result<Json<Snapshot>, AppError> {
    let snapshot = state.sync.fetch().await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushResponse {
    ok: bool,
    version: u64,
    updated_at: i64,
    merged_data: Snapshot,
}

async fn push_snapshot(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PushResponse>, AppError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::warn!(limit = state.body_limit(), "Rejected oversize push body");
            AppError::BodyTooLarge {
                limit: state.body_limit(),
            }
        } else {
            tracing::warn!(error = %rejection.body_text(), "Failed to read push body");
            AppError::InvalidJson
        }
    })?;
    let request = SyncRequest::from_slice(&body)?;
    let receipt = state.sync.push(request).await?;
    tracing::info!(
        endpoint = "snapshot_push",
        version = receipt.snapshot.version,
        applied = receipt.report.applied(),
        "Accepted snapshot push"
    );
    Ok(Json(PushResponse {
        ok: true,
        version: receipt.snapshot.version,
        updated_at: receipt.snapshot.updated_at,
        merged_data: receipt.snapshot,
    }))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
