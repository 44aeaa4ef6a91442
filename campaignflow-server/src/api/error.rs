//! API errors with structured JSON bodies.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use campaignflow::errors::CampaignError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error detail.
    pub error: ErrorDetail,
}

/// Machine-readable code plus message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or query.
    #[error("Invalid request: {0}")]
    BadRequest(String),
    /// Nothing tracked for the key.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A run for the subject is already in flight.
    #[error("Run already in progress for {0}")]
    Conflict(String),
    /// The run failed.
    #[error(transparent)]
    Campaign(#[from] CampaignError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            Self::Conflict(_) => (StatusCode::CONFLICT, "RUN_IN_PROGRESS", self.to_string()),
            Self::Campaign(err) => {
                let status = match err {
                    CampaignError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    CampaignError::Stage(_) => StatusCode::BAD_GATEWAY,
                    CampaignError::Persistence { .. }
                    | CampaignError::Config(_)
                    | CampaignError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(code = err.code(), error = %err, "Campaign request failed");
                }
                (status, err.code(), err.to_string())
            }
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
