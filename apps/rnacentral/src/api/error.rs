//! API error type and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rnacentral_core::search::QueryError;
use serde_json::json;
use tracing::error;

use crate::jobs::QueueError;

/// Failure of a request handler.
///
/// Client errors carry a fixed message; internal errors are logged and
/// answered with a generic body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    InvalidQuery(QueryError),
    NotFound(&'static str),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            Self::InvalidQuery(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": e.code(), "message": e.message() }),
            ),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "detail": message })),
            Self::Internal(detail) => {
                error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<rnacentral_core::Error> for ApiError {
    fn from(e: rnacentral_core::Error) -> Self {
        match e {
            rnacentral_core::Error::NotFound { .. } => Self::NotFound("Not found"),
            rnacentral_core::Error::InvalidUpi(_) => Self::NotFound("Not found"),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::InvalidQuery(e)
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::Internal(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
