//! HTTP-facing error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use workout_analytics::{AnalyticsError, ReconcileError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("workout service unreachable: {0}")]
    UpstreamUnavailable(String),

    #[error("workout service error: {body}")]
    Upstream { status: u16, body: String },

    #[error("corrupt report document: {0}")]
    Integrity(#[from] ReconcileError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Integrity(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Http(e) => ApiError::UpstreamUnavailable(e.to_string()),
            AnalyticsError::Upstream { status, body } => ApiError::Upstream { status, body },
            AnalyticsError::InvalidDate(m) | AnalyticsError::InvalidRange(m) => {
                ApiError::Validation(m)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Result type alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
