//! Error to HTTP response mapping.

use crate::Error;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// An [`Error`] rendered as `{"detail": "..."}` with a mapped status code.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

/// Maps a domain error to its HTTP status.
///
/// | Error | Status |
/// |-------|--------|
/// | `InvalidInput` | 422 |
/// | `Duplicate`, `Conflict`, `DuplicateExternalResource` | 409 |
/// | `NotFound` | 404 |
/// | everything else | 500 |
#[must_use]
pub const fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Duplicate { .. } | Error::Conflict { .. } | Error::DuplicateExternalResource { .. } => {
            StatusCode::CONFLICT
        },
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::StorageUnavailable { .. }
        | Error::ExternalService { .. }
        | Error::LocalCleanupFailed { .. }
        | Error::UnknownBackend(_)
        | Error::OperationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "Request rejected");
        }
        metrics::counter!("http_errors_total", "status" => status.as_str().to_string()).increment(1);

        (status, Json(serde_json::json!({ "detail": self.0.to_string() }))).into_response()
    }
}
