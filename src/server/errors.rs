//! JSON error responses for the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::BridgeError;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}

/// HTTP-facing wrapper around a [`BridgeError`]
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    message: String,
}

pub(crate) fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::InvalidRequest(_) | BridgeError::InvalidReference(_) => StatusCode::BAD_REQUEST,
        BridgeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        BridgeError::ExtractionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        BridgeError::ExtractionFailed(_) | BridgeError::FileNotFound(_) | BridgeError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self {
            status: status_for(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "download request failed");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
