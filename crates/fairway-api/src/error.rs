use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fairway_core::sync::too_large_message;
use fairway_core::Snapshot;
use serde::Serialize;
use thiserror::Error;

const CONFLICT_MESSAGE: &str = "Data has been modified by another client";
const TOO_LARGE_SUGGESTION: &str = "Archive old bookings or reduce data volume";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Missing or invalid baseVersion")]
    InvalidBaseVersion,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Conflict")]
    Conflict {
        current_version: u64,
        server_data: Box<Snapshot>,
    },
    #[error("Data too large")]
    TooLarge { size: usize, limit: usize },
    #[error("Request body too large")]
    BodyTooLarge { limit: usize },
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConflictBody {
    error: &'static str,
    message: &'static str,
    current_version: u64,
    server_data: Box<Snapshot>,
}

#[derive(Debug, Serialize)]
struct TooLargeBody {
    error: &'static str,
    message: String,
    suggestion: &'static str,
}

#[derive(Debug, Serialize)]
struct InternalBody {
    error: &'static str,
    message: String,
}

impl AppError {
    const fn label(&self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON",
            Self::InvalidBaseVersion => "Missing or invalid baseVersion",
            Self::Unauthorized => "Unauthorized",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::Conflict { .. } => "Conflict",
            Self::TooLarge { .. } | Self::BodyTooLarge { .. } => "Data too large",
            Self::Internal(_) => "Internal server error",
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::InvalidBaseVersion => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::TooLarge { .. } | Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<fairway_core::Error> for AppError {
    fn from(error: fairway_core::Error) -> Self {
        use fairway_core::Error as CoreError;

        match error {
            CoreError::MalformedInput(_) => Self::InvalidJson,
            CoreError::InvalidBaseVersion => Self::InvalidBaseVersion,
            CoreError::VersionConflict {
                current_version,
                server_snapshot,
            } => Self::Conflict {
                current_version,
                server_data: server_snapshot,
            },
            CoreError::PayloadTooLarge { size, limit } => Self::TooLarge { size, limit },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Conflict {
                current_version,
                server_data,
            } => (
                status,
                Json(ConflictBody {
                    error: "Conflict",
                    message: CONFLICT_MESSAGE,
                    current_version,
                    server_data,
                }),
            )
                .into_response(),
            Self::TooLarge { size, limit } => (
                status,
                Json(TooLargeBody {
                    error: "Data too large",
                    message: too_large_message(size, limit),
                    suggestion: TOO_LARGE_SUGGESTION,
                }),
            )
                .into_response(),
            Self::BodyTooLarge { limit } => (
                status,
                Json(TooLargeBody {
                    error: "Data too large",
                    message: format!("Request body exceeds {}KB limit", limit / 1024),
                    suggestion: TOO_LARGE_SUGGESTION,
                }),
            )
                .into_response(),
            Self::Internal(message) => {
                tracing::error!(%message, "Request failed");
                (
                    status,
                    Json(InternalBody {
                        error: "Internal server error",
                        message,
                    }),
                )
                    .into_response()
            }
            simple => (
                status,
                Json(ErrorBody {
                    error: simple.label(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_http_statuses() {
        let cases = [
            (
                AppError::from(fairway_core::Error::MalformedInput("eof".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(fairway_core::Error::InvalidBaseVersion),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::from(fairway_core::Error::PayloadTooLarge {
                    size: 2_000_000,
                    limit: 1_048_576,
                }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::from(fairway_core::Error::Storage("disk full".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.status(), status);
        }
    }

    #[test]
    fn conflict_keeps_server_snapshot() {
        let error = AppError::from(fairway_core::Error::VersionConflict {
            current_version: 3,
            server_snapshot: Box::new(Snapshot::empty(0)),
        });
        assert!(matches!(
            error,
            AppError::Conflict {
                current_version: 3,
                ..
            }
        ));
        assert_eq!(error.status(), StatusCode::CONFLICT);
    }
}
