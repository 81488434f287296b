//! Unified error handling for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::sync::{SyncError, SyncFailure};

/// Application-level error type for the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(
            self,
            Self::Database(RepositoryError::Database(_)) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Database(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::Database(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for SyncFailure {
    fn into_response(self) -> Response {
        // Upstream and storage failures are worth tracking; guard refusals
        // and unknown tenants are expected caller-level outcomes.
        if matches!(
            self.error,
            SyncError::Fetch { .. } | SyncError::Credentials(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Sync run failed"
            );
        }

        let status = match &self.error {
            SyncError::SyncInProgress(_) => StatusCode::CONFLICT,
            SyncError::TenantNotFound(_) => StatusCode::NOT_FOUND,
            SyncError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            SyncError::Credentials(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.error {
            SyncError::Credentials(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        // Partial progress is always reported: the counts are committed rows
        // a re-run will reconcile, never silently discarded work.
        let body = Json(json!({
            "error": message,
            "stage": self.stage(),
            "partialCounts": self.partial,
        }));

        (status, body).into_response()
    }
}
