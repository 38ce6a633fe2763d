//! Mapping from storage failures to HTTP responses.

use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use koderstore_core::StorageError;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Storage(StorageError),
    /// The request itself was unusable (bad multipart body, missing field).
    BadRequest(String),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(e) => match e {
                StorageError::Unauthenticated => StatusCode::UNAUTHORIZED,
                StorageError::Forbidden(_) => StatusCode::FORBIDDEN,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Conflict(_) => StatusCode::CONFLICT,
                StorageError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                StorageError::RemoteUnavailable(_) | StorageError::MalformedResponse(_) => {
                    StatusCode::BAD_GATEWAY
                }
                StorageError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(msg) => msg,
            Self::Storage(e) => {
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                } else {
                    tracing::debug!(error = %e, "request rejected");
                }
                e.to_string()
            }
        };
        (status, Json(ErrorRes { error: message })).into_response()
    }
}
