use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode store data: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackerError {
    pub fn not_found() -> Self {
        TrackerError::NotFound("Not found".to_string())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            TrackerError::Store(_) | TrackerError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_http_status() {
        assert_eq!(TrackerError::not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            TrackerError::invalid("ids must be an array").status_code(),
            StatusCode::BAD_REQUEST
        );
        let store = StoreError::Write {
            path: PathBuf::from("data/prospects.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            TrackerError::from(store).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
