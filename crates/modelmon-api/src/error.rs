use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use modelmon_common::EndpointIdError;
use modelmon_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("failed to decode {what}: {source}")]
    Deserialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidArgument(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Store(StoreError::InvalidTime(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::BAD_GATEWAY,
            ApiError::Deserialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PreconditionFailed(_) => "precondition_failed",
            ApiError::Store(StoreError::InvalidTime(_)) => "invalid_argument",
            ApiError::Store(_) => "store_error",
            ApiError::Deserialization { .. } => "deserialization_error",
        }
    }
}

impl From<EndpointIdError> for ApiError {
    fn from(e: EndpointIdError) -> Self {
        match e {
            EndpointIdError::ProjectMismatch { .. } => ApiError::Conflict(e.to_string()),
            EndpointIdError::Malformed(_) | EndpointIdError::InvalidProject(_) => {
                ApiError::InvalidArgument(e.to_string())
            }
        }
    }
}

/// Attached to error responses so middleware can classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub &'static str);

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    request_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let request_id = format!("req_{}", Uuid::new_v4());

        if status.is_server_error() {
            tracing::error!(%request_id, code, error = %self, "request failed");
        } else {
            tracing::debug!(%request_id, code, error = %self, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message: self.to_string(),
                request_id,
            },
        };
        let mut resp = (status, Json(body)).into_response();
        resp.extensions_mut().insert(ErrorCode(code));
        resp
    }
}
