//! Error taxonomy for the ingestion service.
//!
//! Request-level failures ([`UploadError`]) are recovered into an HTTP
//! status and body and never crash a request worker. Startup failures
//! ([`ConfigError`]) are fatal to the service but retryable by the host
//! application once the operator restores the data folder.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Startup-time configuration failures. Every variant carries enough path
/// context for the operator message to be actionable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config.json not found at {path} - restore the data folder to its original location")]
    MissingConfig { path: PathBuf },

    #[error("failed to parse {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config.json at {path} does not name a data_dir")]
    MissingDataDir { path: PathBuf },

    #[error("data directory {path} does not exist - restore it or update config.json")]
    DataDirNotFound { path: PathBuf },

    #[error("failed to write default paths.json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures a request handler can return. Maps onto the HTTP surface:
/// missing query parameters are the caller's fault (400), unknown
/// identifiers are 404, everything behind the record store or the disk
/// is a 500.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Persistence(#[source] anyhow::Error),

    #[error("Save error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            UploadError::NotFound(_) => StatusCode::NOT_FOUND,
            UploadError::Persistence(_) | UploadError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (
                UploadError::MissingParameter("client ID"),
                StatusCode::BAD_REQUEST,
            ),
            (UploadError::NotFound("Client"), StatusCode::NOT_FOUND),
            (
                UploadError::Persistence(anyhow::anyhow!("db locked")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                UploadError::Storage(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
