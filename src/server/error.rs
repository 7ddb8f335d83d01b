// src/server/error.rs

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::errors::MergeError;

/// Maps [`MergeError`] onto HTTP responses for the control surface.
#[derive(Debug)]
pub struct ApiError(pub MergeError);

impl From<MergeError> for ApiError {
    fn from(err: MergeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            MergeError::TemplateNotFound(_) => (StatusCode::NOT_FOUND, "template_not_found"),
            MergeError::SourceNotFound(_) => (StatusCode::NOT_FOUND, "source_not_found"),
            MergeError::InvalidOptions(_) => (StatusCode::BAD_REQUEST, "invalid_options"),
            MergeError::HttpError(_) | MergeError::ProxyError(_) => {
                (StatusCode::BAD_GATEWAY, "worker_unavailable")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(error = %self.0, %status, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": kind });
        (status, Json(body)).into_response()
    }
}
