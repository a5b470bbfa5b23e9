//! Error types for mwrt-server
//!
//! Client input problems answer 400 with a description. Everything else
//! answers 500 with a fixed message; the detail is logged by the service
//! that failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ForwardError;

/// Body text of every 500 response
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Something went wrong on our side :( Please let us know and we will fix it.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Content-Type is not application/json or text/plain (400)
    #[error("Incompatable MIME type.")]
    UnsupportedMediaType,

    /// Required payload key absent (400)
    #[error("Data not formatted correctly. KeyError: '{0}'")]
    MissingKey(&'static str),

    /// Payload is not JSON or a field has the wrong type (400)
    #[error("Data not formatted correctly. {0}")]
    Malformed(String),

    /// Forwarding to MammalWeb failed (500)
    #[error("Upstream failure: {0}")]
    Upstream(#[from] ForwardError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnsupportedMediaType | ApiError::MissingKey(_) | ApiError::Malformed(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            // Detail was logged where the failure happened
            ApiError::Upstream(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
